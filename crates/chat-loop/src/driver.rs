//! The chat orchestration loop.
//!
//! One `chat` call appends the caller's batch to the history, asks the
//! provider for a response, and keeps feeding tool results back until the
//! provider resolves a plain message. Tool rounds are driven as an explicit
//! iterative loop with a worklist batch, so recursion depth is bounded only
//! by the configured round limit (unbounded when unset).

use std::sync::Arc;

use tokio::sync::mpsc;

use chat_history::{ChatHistory, Message};

use crate::error::{ChatError, Result};
use crate::events::ChatEvent;
use crate::provider::{BoxError, ChatProvider};
use crate::tools::ToolExecutor;

/// Configuration for a driver instance.
pub struct ChatConfig {
    /// System instructions sent with every provider call.
    pub instructions: String,
    /// Override for the summarization system prompt.
    pub summary_prompt: Option<String>,
    /// Optional guard against runaway tool recursion. `None` leaves tool
    /// rounds unbounded, matching the base policy.
    pub max_tool_rounds: Option<usize>,
    /// Observability channel; events are dropped when absent or full closed.
    pub events: Option<mpsc::Sender<ChatEvent>>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            instructions: String::new(),
            summary_prompt: None,
            max_tool_rounds: None,
            events: None,
        }
    }
}

/// Drives the request/response cycle for one conversation.
///
/// Owns its history buffer exclusively; a driver instance must not be
/// shared across overlapping orchestration runs.
pub struct ChatDriver {
    history: ChatHistory,
    provider: Arc<dyn ChatProvider>,
    tools: Arc<dyn ToolExecutor>,
    config: ChatConfig,
}

impl ChatDriver {
    pub fn new(
        history: ChatHistory,
        provider: Arc<dyn ChatProvider>,
        tools: Arc<dyn ToolExecutor>,
        config: ChatConfig,
    ) -> Self {
        Self {
            history,
            provider,
            tools,
            config,
        }
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Run a full chat turn for a single input message.
    pub async fn chat(&mut self, message: Message) -> Result<Message> {
        self.chat_batch(vec![message]).await
    }

    /// Run a full chat turn for an ordered input batch, then, when
    /// summarization is enabled and a non-empty snapshot exists, a second
    /// pass that attaches the summary text to the response.
    pub async fn chat_batch(&mut self, messages: Vec<Message>) -> Result<Message> {
        let mut response = self.drive(messages).await?;

        let has_snapshot = self
            .history
            .last_summary_request()
            .is_some_and(|snapshot| !snapshot.text().is_empty());
        if self.history.should_summarize() && has_snapshot {
            let summary = self.summarize().await?;
            response.summary = summary.content;
        }

        Ok(response)
    }

    async fn drive(&mut self, batch: Vec<Message>) -> Result<Message> {
        let mut pending = batch;
        let mut rounds = 0usize;

        loop {
            self.emit(ChatEvent::ChatStart).await;
            for message in pending {
                self.history.add_message(message).await?;
            }

            let tools = self.tools.available_tools();
            self.emit(ChatEvent::InferenceStart {
                message: self.history.last_message().cloned(),
            })
            .await;
            log::debug!(
                "requesting inference with {} message(s) and {} tool(s)",
                self.history.messages().len(),
                tools.len()
            );

            let response = match self
                .provider
                .chat(self.history.messages(), &self.config.instructions, &tools)
                .await
            {
                Ok(response) => response,
                Err(source) => return Err(self.provider_failure(source).await),
            };
            self.emit(ChatEvent::InferenceStop {
                last: self.history.last_message().cloned(),
                response: response.clone(),
            })
            .await;

            if response.is_tool_call() {
                rounds += 1;
                if let Some(limit) = self.config.max_tool_rounds {
                    if rounds > limit {
                        log::warn!("aborting after {rounds} tool rounds");
                        return Err(ChatError::ToolRoundLimit(limit));
                    }
                }
                log::debug!(
                    "tool round {rounds}: executing {} call(s)",
                    response.tools.len()
                );
                let result = self.execute_tools(&response).await?;
                pending = vec![response, result];
                continue;
            }

            self.emit(ChatEvent::MessageSaving {
                message: response.clone(),
            })
            .await;
            self.history.add_message(response.clone()).await?;
            self.emit(ChatEvent::MessageSaved {
                message: response.clone(),
            })
            .await;
            self.emit(ChatEvent::ChatStop).await;
            return Ok(response);
        }
    }

    async fn execute_tools(&self, call: &Message) -> Result<Message> {
        let mut completed = Vec::with_capacity(call.tools.len());
        for tool in &call.tools {
            completed.push(self.tools.execute(tool).await?);
        }
        Ok(Message::tool_call_result(completed))
    }

    /// Independent pass over the pre-summary snapshot: the snapshot is
    /// submitted as input, the summarization instruction replaces the
    /// system prompt, no tools are attached, and the summary reply stays
    /// out of the main history.
    async fn summarize(&mut self) -> Result<Message> {
        self.emit(ChatEvent::ChatStart).await;

        let request = self
            .history
            .last_summary_request()
            .cloned()
            .unwrap_or_else(|| Message::user(String::new()));
        self.history.add_message(request.clone()).await?;
        self.emit(ChatEvent::InferenceStart {
            message: Some(request),
        })
        .await;

        let prompt = self
            .history
            .summary_prompt(self.config.summary_prompt.as_deref())
            .unwrap_or_default();
        let snapshot = self.history.pre_summary_history().to_vec();

        let response = match self.provider.chat(&snapshot, &prompt, &[]).await {
            Ok(response) => response,
            Err(source) => return Err(self.provider_failure(source).await),
        };
        self.emit(ChatEvent::InferenceStop {
            last: self.history.last_summary_request().cloned(),
            response: response.clone(),
        })
        .await;
        self.emit(ChatEvent::ChatStop).await;

        Ok(response)
    }

    async fn provider_failure(&self, source: BoxError) -> ChatError {
        let message = source.to_string();
        log::warn!("provider call failed: {message}");
        self.emit(ChatEvent::Error {
            message: message.clone(),
        })
        .await;
        ChatError::Provider { message, source }
    }

    async fn emit(&self, event: ChatEvent) {
        if let Some(sender) = &self.config.events {
            let _ = sender.send(event).await;
        }
    }
}
