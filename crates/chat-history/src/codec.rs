//! Conversion between persisted records and typed messages.
//!
//! The record schema is the durable/transport form of a message:
//! `{ type?, role, content?, usage?, attachments?, tools?, ...metadata }`.
//! `Message` implements `Serialize`/`Deserialize` by delegating here, so the
//! history buffer's serialized form is simply its ordered message sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::HistoryError;
use crate::message::{Attachment, Message, Role, Tool, Usage};

pub const TYPE_TOOL_CALL: &str = "tool_call";
pub const TYPE_TOOL_CALL_RESULT: &str = "tool_call_result";

/// The persisted record form of a message. Unrecognized top-level keys are
/// collected into `metadata` and round-trip opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

pub fn encode_message(message: &Message) -> MessageRecord {
    let kind = match message.role {
        Role::ToolCall => Some(TYPE_TOOL_CALL.to_string()),
        Role::ToolCallResult => Some(TYPE_TOOL_CALL_RESULT.to_string()),
        _ => None,
    };

    MessageRecord {
        kind,
        role: message.role.as_str().to_string(),
        id: Some(message.id.clone()),
        content: message.content.clone(),
        usage: message.usage,
        attachments: message.attachments.clone(),
        tools: message.tools.clone(),
        created_at: Some(message.created_at),
        metadata: message.metadata.clone(),
    }
}

/// Reconstruct a typed message from a persisted record.
///
/// Dispatches on the `type` tag first: `tool_call` rebuilds the invocation
/// list, `tool_call_result` additionally requires a call id on every tool.
/// Any other (or absent) tag falls through to role dispatch, where an
/// unknown role is a hard error.
pub fn decode_record(record: MessageRecord) -> Result<Message, HistoryError> {
    let role = match record.kind.as_deref() {
        Some(TYPE_TOOL_CALL) => Role::ToolCall,
        Some(TYPE_TOOL_CALL_RESULT) => {
            for tool in &record.tools {
                if tool.call_id.is_none() {
                    return Err(HistoryError::MissingCallId(tool.name.clone()));
                }
            }
            Role::ToolCallResult
        }
        _ => Role::parse(&record.role)?,
    };

    Ok(Message {
        id: record.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        role,
        content: record.content,
        usage: record.usage,
        attachments: record.attachments,
        tools: record.tools,
        metadata: record.metadata,
        created_at: record.created_at.unwrap_or_else(Utc::now),
        summary: None,
    })
}

pub fn decode_records(records: Vec<MessageRecord>) -> Result<Vec<Message>, HistoryError> {
    records.into_iter().map(decode_record).collect()
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        encode_message(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = MessageRecord::deserialize(deserializer)?;
        decode_record(record).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::AttachmentContentType;
    use serde_json::json;

    fn round_trip(message: &Message) -> Message {
        let encoded = serde_json::to_string(message).unwrap();
        serde_json::from_str(&encoded).unwrap()
    }

    #[test]
    fn plain_message_round_trips() {
        let message = Message::user("Hello!")
            .with_usage(Usage::new(120, 40))
            .with_metadata("trace_id", json!("abc-123"));
        let decoded = round_trip(&message);

        assert_eq!(decoded.role, Role::User);
        assert_eq!(decoded.content.as_deref(), Some("Hello!"));
        assert_eq!(decoded.usage, Some(Usage::new(120, 40)));
        assert_eq!(decoded.metadata["trace_id"], json!("abc-123"));
        assert_eq!(decoded.id, message.id);
    }

    #[test]
    fn attachments_round_trip() {
        let message = Message::user("See attached")
            .with_attachment(
                Attachment::image("aGVsbG8=", AttachmentContentType::Base64)
                    .with_media_type("image/png"),
            )
            .with_attachment(Attachment::document(
                "https://example.com/report.pdf",
                AttachmentContentType::Url,
            ));
        let decoded = round_trip(&message);
        assert_eq!(decoded.attachments, message.attachments);
    }

    #[test]
    fn tool_call_round_trips_with_type_tag() {
        let message = Message::tool_call(
            "Looking that up",
            vec![Tool::new("search", "Search the web")
                .with_inputs(json!({"query": "rust"}).as_object().unwrap().clone())
                .with_call_id("call_1")],
        );

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], json!("tool_call"));

        let decoded: Message = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.role, Role::ToolCall);
        assert_eq!(decoded.tools, message.tools);
    }

    #[test]
    fn tool_call_result_preserves_name_call_id_and_result() {
        let message = Message::tool_call_result(vec![
            Tool::new("search", "Search the web")
                .with_call_id("call_1")
                .with_result(json!({"hits": 3})),
            Tool::new("fetch", "Fetch a page")
                .with_call_id("call_2")
                .with_result(json!("<html/>")),
        ]);
        let decoded = round_trip(&message);

        assert_eq!(decoded.role, Role::ToolCallResult);
        for (original, restored) in message.tools.iter().zip(&decoded.tools) {
            assert_eq!(restored.name, original.name);
            assert_eq!(restored.call_id, original.call_id);
            assert_eq!(restored.result, original.result);
        }
    }

    #[test]
    fn tool_call_result_without_call_id_is_rejected() {
        let record = json!({
            "type": "tool_call_result",
            "role": "tool_call_result",
            "tools": [{"name": "search", "description": "Search the web", "result": "ok"}],
        });
        let error = serde_json::from_value::<Message>(record).unwrap_err();
        assert!(error.to_string().contains("missing its call id"));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let record = json!({"role": "moderator", "content": "hi"});
        assert!(serde_json::from_value::<Message>(record).is_err());
    }

    #[test]
    fn unknown_type_tag_falls_back_to_role_dispatch() {
        let record = json!({"type": "annotation", "role": "assistant", "content": "hi"});
        let decoded: Message = serde_json::from_value(record).unwrap();
        assert_eq!(decoded.role, Role::Assistant);
    }

    #[test]
    fn extra_keys_become_opaque_metadata() {
        let record = json!({
            "role": "user",
            "content": "hi",
            "channel": "web",
            "priority": 3,
        });
        let decoded: Message = serde_json::from_value(record).unwrap();
        assert_eq!(decoded.metadata["channel"], json!("web"));
        assert_eq!(decoded.metadata["priority"], json!(3));

        let encoded = serde_json::to_value(&decoded).unwrap();
        assert_eq!(encoded["channel"], json!("web"));
        assert_eq!(encoded["priority"], json!(3));
    }

    #[test]
    fn records_without_id_or_timestamp_are_defaulted() {
        let record = json!({"role": "assistant", "content": "hi"});
        let decoded: Message = serde_json::from_value(record).unwrap();
        assert!(!decoded.id.is_empty());
    }

    #[test]
    fn summary_field_is_never_persisted() {
        let mut message = Message::assistant("final");
        message.summary = Some("a summary".to_string());
        let value = serde_json::to_value(&message).unwrap();
        assert!(!value.as_object().unwrap().contains_key("summary"));
    }
}
