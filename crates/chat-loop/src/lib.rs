//! Asynchronous chat orchestration over a token-budgeted history buffer.
//!
//! `ChatDriver` fills a `ChatHistory`, calls the provider, executes any
//! requested tools, feeds the results back until the provider resolves a
//! final message, and optionally runs a summarization pass over the
//! pre-summary snapshot. Provider transport, tool business logic, and event
//! consumers are injected collaborators.

pub mod driver;
pub mod error;
pub mod events;
pub mod provider;
pub mod tools;

pub use driver::{ChatConfig, ChatDriver};
pub use error::{ChatError, Result};
pub use events::ChatEvent;
pub use provider::{BoxError, ChatProvider};
pub use tools::{NoTools, ToolError, ToolExecutor};
