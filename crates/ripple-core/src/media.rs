//! Media attachments carried by direct messages.

use serde::{Deserialize, Serialize};

/// Kind of a media attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Video clip.
    Video,
    /// Audio clip (voice message).
    Audio,
}

impl MediaKind {
    /// Stable string form used in persisted JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// A single attachment on a message.
///
/// The `url` is a location reference into the upload store — this crate
/// never reads or writes the referenced bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAttachment {
    /// Attachment kind.
    pub kind: MediaKind,
    /// Location reference (upload-store URL).
    pub url: String,
    /// Optional caption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
