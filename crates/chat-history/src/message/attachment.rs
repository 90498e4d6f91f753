use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Document,
}

/// Whether `content` is an inline base64 payload or a URL reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentContentType {
    Url,
    Base64,
}

/// An image or document attached to a message. Unknown `type` or
/// `content_type` tags fail deserialization; the codec treats them as
/// storage corruption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub content: String,
    pub content_type: AttachmentContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl Attachment {
    pub fn image(content: impl Into<String>, content_type: AttachmentContentType) -> Self {
        Self {
            kind: AttachmentKind::Image,
            content: content.into(),
            content_type,
            media_type: None,
        }
    }

    pub fn document(content: impl Into<String>, content_type: AttachmentContentType) -> Self {
        Self {
            kind: AttachmentKind::Document,
            content: content.into(),
            content_type,
            media_type: None,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}
