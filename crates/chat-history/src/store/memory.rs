use async_trait::async_trait;

use crate::error::Result;
use crate::message::Message;
use crate::store::HistoryStore;

/// Volatile backend. The buffer already keeps the live sequence in memory,
/// so every notification is a no-op.
#[derive(Debug, Default)]
pub struct InMemoryStore;

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn store_message(&mut self, _message: &Message) -> Result<()> {
        Ok(())
    }

    async fn remove_oldest(&mut self) -> Result<()> {
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        Ok(())
    }
}
