use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::message::Message;
use crate::store::HistoryStore;

/// Durable backend writing one JSON record per line.
///
/// Appends are cheap; removing the oldest record rewrites the file from a
/// mirrored deque, which is acceptable at conversation scale.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    records: VecDeque<Message>,
}

impl JsonlStore {
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{name}.jsonl")),
            records: VecDeque::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn rewrite(&self) -> Result<()> {
        let mut buffer = String::new();
        for message in &self.records {
            buffer.push_str(&serde_json::to_string(message)?);
            buffer.push('\n');
        }
        fs::write(&self.path, buffer).await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for JsonlStore {
    async fn load(&mut self) -> Result<Vec<Message>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(error) => return Err(error.into()),
        };

        let mut messages = Vec::new();
        for line in content.lines().filter(|line| !line.trim().is_empty()) {
            messages.push(serde_json::from_str::<Message>(line)?);
        }

        self.records = messages.iter().cloned().collect();
        log::debug!(
            "restored {} message(s) from {}",
            messages.len(),
            self.path.display()
        );
        Ok(messages)
    }

    async fn store_message(&mut self, message: &Message) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        self.records.push_back(message.clone());
        Ok(())
    }

    async fn remove_oldest(&mut self) -> Result<()> {
        if self.records.pop_front().is_some() {
            self.rewrite().await?;
        }
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.records.clear();
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}
