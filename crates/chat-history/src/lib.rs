//! Token-budgeted conversation memory.
//!
//! A `ChatHistory` holds the ordered message sequence fed to a language-model
//! provider, tracks marginal token usage per message, and evicts the oldest
//! messages once the configured context window is exceeded. Storage backends
//! are pluggable; the record codec converts persisted records into typed
//! messages and back.

pub mod codec;
pub mod error;
pub mod history;
pub mod message;
pub mod store;

pub use codec::{decode_record, decode_records, encode_message, MessageRecord};
pub use error::{HistoryError, Result};
pub use history::{
    ChatHistory, HistoryConfig, DEFAULT_CONTEXT_WINDOW, DEFAULT_SUMMARY_PROMPT,
    SUMMARY_REQUEST_HEADER,
};
pub use message::{Attachment, AttachmentContentType, AttachmentKind, Message, Role, Tool, Usage};
pub use store::{HistoryStore, InMemoryStore, JsonlStore};
