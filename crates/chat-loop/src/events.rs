use serde::{Deserialize, Serialize};

use chat_history::Message;

/// Observability events emitted by the driver, fire-and-forget, over an
/// optional channel. Tag names match the notifier contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChatEvent {
    ChatStart,
    InferenceStart {
        message: Option<Message>,
    },
    InferenceStop {
        last: Option<Message>,
        response: Message,
    },
    MessageSaving {
        message: Message,
    },
    MessageSaved {
        message: Message,
    },
    ChatStop,
    Error {
        message: String,
    },
}

impl ChatEvent {
    /// The wire tag, convenient for asserting event order.
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::ChatStart => "chat-start",
            ChatEvent::InferenceStart { .. } => "inference-start",
            ChatEvent::InferenceStop { .. } => "inference-stop",
            ChatEvent::MessageSaving { .. } => "message-saving",
            ChatEvent::MessageSaved { .. } => "message-saved",
            ChatEvent::ChatStop => "chat-stop",
            ChatEvent::Error { .. } => "error",
        }
    }
}
