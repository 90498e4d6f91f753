//! Message data model shared by the history buffer and the chat loop.

mod attachment;
mod tool;

pub use attachment::{Attachment, AttachmentContentType, AttachmentKind};
pub use tool::Tool;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::HistoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    ToolCall,
    ToolCallResult,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::ToolCall => "tool_call",
            Role::ToolCallResult => "tool_call_result",
        }
    }

    /// Parse a persisted role tag. Unknown tags are a hard error.
    pub fn parse(value: &str) -> Result<Self, HistoryError> {
        match value {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool_call" => Ok(Role::ToolCall),
            "tool_call_result" => Ok(Role::ToolCallResult),
            other => Err(HistoryError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token consumption reported for a single message.
///
/// Once a message is stored in a `ChatHistory`, `input_tokens` holds only the
/// marginal contribution at insertion time, not the provider's cumulative
/// count. Marginal values may go negative when the provider's cumulative
/// count decreased, e.g. after external truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: i64,
    pub output_tokens: i64,
}

impl Usage {
    pub fn new(input_tokens: i64, output_tokens: i64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }
}

/// A single conversation message.
///
/// Tool call messages carry the requested invocations in `tools`; tool call
/// result messages carry the same list with results and call ids filled in.
/// `summary` is auxiliary output attached by the chat loop and is never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: Option<String>,
    pub usage: Option<Usage>,
    pub attachments: Vec<Attachment>,
    pub tools: Vec<Tool>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub summary: Option<String>,
}

impl Message {
    pub fn plain(role: Role, content: impl Into<String>) -> Self {
        Self::base(role, Some(content.into()))
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn tool_call(content: impl Into<String>, tools: Vec<Tool>) -> Self {
        let mut message = Self::base(Role::ToolCall, Some(content.into()));
        message.tools = tools;
        message
    }

    pub fn tool_call_result(tools: Vec<Tool>) -> Self {
        let mut message = Self::base(Role::ToolCallResult, None);
        message.tools = tools;
        message
    }

    pub(crate) fn base(role: Role, content: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            usage: None,
            attachments: Vec::new(),
            tools: Vec::new(),
            metadata: Map::new(),
            created_at: Utc::now(),
            summary: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Message text, empty for content-less messages such as tool results.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn is_tool_call(&self) -> bool {
        self.role == Role::ToolCall
    }
}
