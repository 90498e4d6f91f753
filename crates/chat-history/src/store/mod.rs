//! Pluggable persistence backends for the history buffer.

mod file;
mod memory;

pub use file::JsonlStore;
pub use memory::InMemoryStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::message::Message;

/// Storage backend contract.
///
/// The buffer calls `store_message` once per accepted append (before any
/// eviction), `remove_oldest` once per evicted element, and `clear` on a
/// full flush. No payload is passed on removal; the backend tracks its own
/// oldest pointer. Durable backends restore in-memory history via `load`.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Restore previously persisted history, oldest first.
    async fn load(&mut self) -> Result<Vec<Message>> {
        Ok(Vec::new())
    }

    async fn store_message(&mut self, message: &Message) -> Result<()>;

    async fn remove_oldest(&mut self) -> Result<()>;

    async fn clear(&mut self) -> Result<()>;
}
