use async_trait::async_trait;

use chat_history::{Message, Tool};

/// Boxed error surfaced by provider implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Language-model provider contract.
///
/// One call resolves exactly one message, possibly a tool call message.
/// Transport, retries, and timeouts are the implementor's concern; the
/// driver never retries.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(
        &self,
        messages: &[Message],
        system_prompt: &str,
        tools: &[Tool],
    ) -> std::result::Result<Message, BoxError>;
}
