//! The token-budgeted message buffer.
//!
//! Providers report `input_tokens` as the cumulative context size sent on a
//! turn, not the cost of the new message alone. To keep a running budget
//! without double counting, each appended message records only its marginal
//! input contribution: the reported value minus everything already recorded
//! in the buffer. Totals and free budget are recomputed from the live
//! sequence on demand, so they stay consistent through eviction.

use crate::error::Result;
use crate::message::{Message, Role, Usage};
use crate::store::{HistoryStore, InMemoryStore};

pub const DEFAULT_CONTEXT_WINDOW: i64 = 50_000;

/// System instruction used for the summarization pass when no override is
/// supplied.
pub const DEFAULT_SUMMARY_PROMPT: &str = "You are a helpful assistant who summarizes messages in the best possible way for an LLM's understanding";

/// Instruction header of the pre-summary snapshot message.
pub const SUMMARY_REQUEST_HEADER: &str = "Summarize the conversation below using concise bullet points. Maintain a focus on any requests, questions, or action items the user may have raised. Include:\n- Key topics discussed\n- Notable shifts in tone\n- Questions asked and answered\n\n";

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Token budget the buffer may not exceed.
    pub context_window: i64,
    /// Capture a pre-summary snapshot before evicting on overflow.
    pub summarize: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            summarize: false,
        }
    }
}

/// Ordered message buffer with a hard token budget.
///
/// Designed for single-owner, non-concurrent use: one instance per
/// conversation. The buffer exclusively owns its sequences; callers mutate
/// only through its methods.
pub struct ChatHistory {
    store: Box<dyn HistoryStore>,
    history: Vec<Message>,
    pre_summary: Vec<Message>,
    context_window: i64,
    summarize: bool,
}

impl ChatHistory {
    /// Volatile buffer with a no-op backend.
    pub fn new(config: HistoryConfig) -> Self {
        Self::from_parts(Box::new(InMemoryStore), Vec::new(), config)
    }

    /// Buffer over a persistent backend, restoring any durable history.
    /// Restored messages keep their persisted marginal usage values.
    pub async fn with_store(
        mut store: Box<dyn HistoryStore>,
        config: HistoryConfig,
    ) -> Result<Self> {
        let history = store.load().await?;
        Ok(Self::from_parts(store, history, config))
    }

    fn from_parts(store: Box<dyn HistoryStore>, history: Vec<Message>, config: HistoryConfig) -> Self {
        Self {
            store,
            history,
            pre_summary: Vec::new(),
            context_window: config.context_window,
            summarize: config.summarize,
        }
    }

    /// Append a message, rewriting its usage to the marginal contribution,
    /// notifying the backend, and evicting down to the context window.
    pub async fn add_message(&mut self, mut message: Message) -> Result<()> {
        if let Some(usage) = message.usage {
            message.usage = Some(self.marginal_usage(usage));
        }

        self.store.store_message(&message).await?;
        self.history.push(message);
        self.enforce_context_window().await
    }

    /// Append a batch in order.
    pub async fn add_messages(&mut self, messages: Vec<Message>) -> Result<()> {
        for message in messages {
            self.add_message(message).await?;
        }
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.history
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }

    /// Last generated summary-request snapshot, if any.
    pub fn last_summary_request(&self) -> Option<&Message> {
        self.pre_summary.last()
    }

    /// The pre-summary snapshot sequence (at most one element).
    pub fn pre_summary_history(&self) -> &[Message] {
        &self.pre_summary
    }

    /// Sum of marginal input plus output tokens over the retained messages.
    pub fn total_usage(&self) -> i64 {
        self.history
            .iter()
            .filter_map(|message| message.usage.as_ref())
            .map(Usage::total)
            .sum()
    }

    /// Remaining token budget. Zero means full but not over budget.
    pub fn free_memory(&self) -> i64 {
        self.context_window - self.total_usage()
    }

    pub fn should_summarize(&self) -> bool {
        self.summarize
    }

    /// Summarization system instruction: `None` when summarization is
    /// disabled, otherwise the caller override or the fixed default.
    pub fn summary_prompt(&self, prompt: Option<&str>) -> Option<String> {
        if !self.summarize {
            return None;
        }
        Some(prompt.unwrap_or(DEFAULT_SUMMARY_PROMPT).to_string())
    }

    /// Empty the buffer, the backend, and the pre-summary snapshot.
    pub async fn flush_all(&mut self) -> Result<()> {
        self.store.clear().await?;
        self.history.clear();
        self.pre_summary.clear();
        Ok(())
    }

    fn marginal_usage(&self, usage: Usage) -> Usage {
        let prior_input: i64 = self
            .history
            .iter()
            .filter_map(|message| message.usage.as_ref())
            .map(|usage| usage.input_tokens)
            .sum();

        // May go negative when the provider's cumulative count decreased,
        // e.g. after external truncation. Accepted, not corrected.
        Usage::new(usage.input_tokens - prior_input, usage.output_tokens)
    }

    async fn enforce_context_window(&mut self) -> Result<()> {
        if self.free_memory() >= 0 {
            return Ok(());
        }

        if self.summarize && self.history.last().map(|message| message.role) == Some(Role::Assistant)
        {
            self.capture_pre_summary();
        }

        let mut evicted = 0usize;
        while self.free_memory() < 0 {
            if self.history.is_empty() {
                break;
            }
            self.store.remove_oldest().await?;
            self.history.remove(0);
            evicted += 1;
        }

        if evicted > 0 {
            log::debug!(
                "evicted {evicted} message(s), free memory now {}",
                self.free_memory()
            );
        }
        Ok(())
    }

    /// Build the summary-request snapshot from the full pre-eviction
    /// history, replacing any previous snapshot.
    fn capture_pre_summary(&mut self) {
        let mut text = String::from(SUMMARY_REQUEST_HEADER);
        for message in &self.history {
            text.push_str(message.role.as_str());
            text.push_str(": ");
            text.push_str(message.text());
            text.push_str("\n\n");
        }
        // Trim the trailing blank-line separator. The two-character cut is
        // a format convention kept for output compatibility.
        text.truncate(text.len() - 2);

        log::debug!("captured pre-summary snapshot of {} message(s)", self.history.len());
        self.pre_summary = vec![Message::user(text)];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volatile(context_window: i64, summarize: bool) -> ChatHistory {
        ChatHistory::new(HistoryConfig {
            context_window,
            summarize,
        })
    }

    #[tokio::test]
    async fn add_message_grows_the_buffer() {
        let mut history = ChatHistory::new(HistoryConfig::default());
        history.add_message(Message::user("Hello!")).await.unwrap();
        assert_eq!(history.messages().len(), 1);
        assert_eq!(history.last_message().unwrap().text(), "Hello!");
    }

    #[tokio::test]
    async fn missing_usage_contributes_nothing() {
        let mut history = volatile(300, false);
        history.add_message(Message::user("Hello!")).await.unwrap();
        assert_eq!(history.total_usage(), 0);
        assert_eq!(history.free_memory(), 300);
    }

    #[tokio::test]
    async fn truncates_to_the_context_window() {
        let mut history = volatile(300, false);
        assert_eq!(history.free_memory(), 300);

        history
            .add_message(Message::user("Hello!").with_usage(Usage::new(100, 100)))
            .await
            .unwrap();
        assert_eq!(history.free_memory(), 100);
        assert_eq!(history.total_usage(), 200);

        // Cumulative report: 300 input covers the first message too.
        history
            .add_message(Message::user("Hello again!").with_usage(Usage::new(300, 100)))
            .await
            .unwrap();
        assert_eq!(history.free_memory(), 0);
        assert_eq!(history.total_usage(), 300);
        assert_eq!(history.messages().len(), 1);
        assert_eq!(history.last_message().unwrap().text(), "Hello again!");
    }

    #[tokio::test]
    async fn marginal_accounting_zeroes_a_repeated_report() {
        let mut history = volatile(300, false);
        let message = Message::user("Hello!").with_usage(Usage::new(100, 100));

        history.add_message(message.clone()).await.unwrap();
        assert_eq!(history.total_usage(), 200);
        assert_eq!(history.free_memory(), 100);

        // Same cumulative report again: prior consumption equals the full
        // first value, so the second record carries zero input tokens.
        history.add_message(message).await.unwrap();
        assert_eq!(history.messages().len(), 2);
        assert_eq!(
            history.messages()[1].usage,
            Some(Usage::new(0, 100))
        );
        assert_eq!(history.total_usage(), 300);
        assert_eq!(history.free_memory(), 0);
    }

    #[tokio::test]
    async fn negative_marginal_input_is_accepted() {
        let mut history = volatile(1_000, false);
        history
            .add_message(Message::user("a").with_usage(Usage::new(400, 0)))
            .await
            .unwrap();
        history
            .add_message(Message::user("b").with_usage(Usage::new(300, 50)))
            .await
            .unwrap();

        assert_eq!(history.messages()[1].usage, Some(Usage::new(-100, 50)));
        assert_eq!(history.total_usage(), 350);
    }

    #[tokio::test]
    async fn exactly_full_buffer_does_not_evict() {
        let mut history = volatile(200, false);
        history
            .add_message(Message::user("Hello!").with_usage(Usage::new(100, 100)))
            .await
            .unwrap();
        assert_eq!(history.free_memory(), 0);
        assert_eq!(history.messages().len(), 1);
    }

    #[tokio::test]
    async fn eviction_is_strict_fifo() {
        let mut history = volatile(250, false);
        for index in 0..5 {
            history
                .add_message(
                    Message::user(format!("m{index}")).with_usage(Usage::new(0, 50)),
                )
                .await
                .unwrap();
        }
        assert_eq!(history.messages().len(), 5);
        assert_eq!(history.free_memory(), 0);

        history
            .add_message(Message::user("m5").with_usage(Usage::new(0, 100)))
            .await
            .unwrap();

        let texts: Vec<&str> = history.messages().iter().map(Message::text).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4", "m5"]);
        assert!(history.free_memory() >= 0);
    }

    #[tokio::test]
    async fn eviction_stops_on_empty_history() {
        let mut history = volatile(10, false);
        history
            .add_message(Message::user("too big").with_usage(Usage::new(50, 0)))
            .await
            .unwrap();
        assert!(history.messages().is_empty());
        assert_eq!(history.free_memory(), 10);
    }

    #[tokio::test]
    async fn flush_all_empties_everything() {
        let mut history = ChatHistory::new(HistoryConfig::default());
        history.add_message(Message::user("Hello!")).await.unwrap();
        history.add_message(Message::user("Hello2!")).await.unwrap();
        history.flush_all().await.unwrap();
        assert!(history.messages().is_empty());
        assert!(history.pre_summary_history().is_empty());
    }

    #[tokio::test]
    async fn overflow_on_assistant_message_captures_snapshot() {
        let mut history = volatile(300, true);
        assert!(history.should_summarize());
        assert!(history.pre_summary_history().is_empty());
        assert!(history.last_summary_request().is_none());

        history
            .add_message(Message::user("Hello!").with_usage(Usage::new(100, 200)))
            .await
            .unwrap();
        history
            .add_message(
                Message::assistant("This reply overflows the window")
                    .with_usage(Usage::new(200, 300)),
            )
            .await
            .unwrap();

        let snapshot = history.last_summary_request().unwrap();
        assert!(snapshot.text().starts_with("Summarize the conversation below"));
        assert!(snapshot.text().contains("user: Hello!"));
        assert!(snapshot
            .text()
            .contains("assistant: This reply overflows the window"));
        assert!(!snapshot.text().ends_with('\n'));
        assert_eq!(history.pre_summary_history().len(), 1);
    }

    #[tokio::test]
    async fn overflow_on_user_message_captures_nothing() {
        let mut history = volatile(100, true);
        history
            .add_message(Message::user("huge").with_usage(Usage::new(500, 0)))
            .await
            .unwrap();
        assert!(history.pre_summary_history().is_empty());
    }

    #[tokio::test]
    async fn snapshot_is_replaced_not_appended() {
        let mut history = volatile(100, true);
        for turn in 0..2 {
            history
                .add_message(Message::user(format!("question {turn}")))
                .await
                .unwrap();
            history
                .add_message(
                    Message::assistant(format!("answer {turn}")).with_usage(Usage::new(0, 200)),
                )
                .await
                .unwrap();
        }
        assert_eq!(history.pre_summary_history().len(), 1);
        assert!(history
            .last_summary_request()
            .unwrap()
            .text()
            .contains("answer 1"));
    }

    #[tokio::test]
    async fn summary_prompt_respects_the_flag_and_override() {
        let disabled = volatile(300, false);
        assert_eq!(disabled.summary_prompt(None), None);
        assert_eq!(disabled.summary_prompt(Some("custom")), None);

        let enabled = volatile(300, true);
        assert_eq!(
            enabled.summary_prompt(None).as_deref(),
            Some(DEFAULT_SUMMARY_PROMPT)
        );
        assert_eq!(enabled.summary_prompt(Some("custom")).as_deref(), Some("custom"));
    }

    #[tokio::test]
    async fn usage_invariants_hold_after_arbitrary_adds() {
        let mut history = volatile(500, false);
        let reports = [(100, 20), (150, 30), (400, 10), (420, 50)];
        for (index, (input, output)) in reports.into_iter().enumerate() {
            history
                .add_message(
                    Message::user(format!("m{index}")).with_usage(Usage::new(input, output)),
                )
                .await
                .unwrap();

            let expected: i64 = history
                .messages()
                .iter()
                .filter_map(|message| message.usage)
                .map(|usage| usage.input_tokens + usage.output_tokens)
                .sum();
            assert_eq!(history.total_usage(), expected);
            assert_eq!(history.free_memory(), 500 - expected);
            assert!(history.free_memory() >= 0 || history.messages().is_empty());
        }
    }
}
