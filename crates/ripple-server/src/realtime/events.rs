//! WebSocket wire-format events.
//!
//! Every frame in both directions is a JSON envelope
//! `{"type": ..., "data": ...}`; server frames additionally carry an
//! ISO-8601 `timestamp`. Field names are camelCase.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ripple_core::{MediaAttachment, Profile};
use ripple_store::MessageRow;

// ── Outbound event types ────────────────────────────────────────────

/// A direct message for the receiver.
pub const NEW_MESSAGE: &str = "new_message";
/// A refreshed conversation snapshot for one participant.
pub const CONVERSATION_UPDATE: &str = "conversation_update";
/// Send acknowledgement for the sender.
pub const MESSAGE_SENT: &str = "message_sent";
/// Send rejection for the sender.
pub const MESSAGE_ERROR: &str = "message_error";
/// The other participant read the conversation.
pub const MESSAGES_READ: &str = "messages_read";
/// The other participant started or stopped typing.
pub const USER_TYPING: &str = "user_typing";
/// A peer came online or went offline.
pub const USER_STATUS: &str = "user_status";
/// A social-action notification.
pub const NOTIFICATION: &str = "notification";
/// Refreshed unread-notification count.
pub const UNREAD_COUNT: &str = "unread_count";
/// Connection authenticated and registered.
pub const AUTH_SUCCESS: &str = "auth_success";

/// Server-pushed event envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerEvent {
    /// Event type (e.g. `new_message`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    /// Event payload.
    pub data: Value,
}

impl ServerEvent {
    /// Create a new event with the current UTC timestamp.
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: ripple_core::now_rfc3339(),
            data,
        }
    }
}

/// Inbound client event, tagged by `type`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Send a direct message.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        /// Receiving user.
        receiver_id: String,
        /// Text content.
        #[serde(default)]
        content: String,
        /// Attachments in send order.
        #[serde(default)]
        attachments: Vec<MediaAttachment>,
    },
    /// Mark a conversation or a single message read.
    #[serde(rename_all = "camelCase")]
    MarkRead {
        /// Conversation to mark read.
        #[serde(default)]
        conversation_id: Option<String>,
        /// Single message to mark read (used when no conversation is given).
        #[serde(default)]
        message_id: Option<String>,
    },
    /// Relay a typing indicator.
    #[serde(rename_all = "camelCase")]
    Typing {
        /// The user being typed at.
        receiver_id: String,
        /// Whether typing started (`true`) or stopped (`false`).
        is_typing: bool,
    },
}

/// A message as serialized onto the wire, optionally enriched with the
/// sender's resolved profile.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    /// Message ID.
    pub id: String,
    /// Conversation this message belongs to.
    pub conversation_id: String,
    /// Sending user.
    pub sender_id: String,
    /// Receiving user.
    pub receiver_id: String,
    /// Text content.
    pub content: String,
    /// Attachments in send order.
    pub attachments: Vec<MediaAttachment>,
    /// Whether the receiver has read this message.
    pub is_read: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Resolved sender profile (present on receiver-facing events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Profile>,
}

impl MessagePayload {
    /// Build from a persisted row. Unparseable attachment JSON degrades to
    /// an empty list rather than failing the delivery path.
    pub fn from_row(row: &MessageRow, sender: Option<Profile>) -> Self {
        Self {
            id: row.id.clone(),
            conversation_id: row.conversation_id.clone(),
            sender_id: row.sender_id.clone(),
            receiver_id: row.receiver_id.clone(),
            content: row.content.clone(),
            attachments: row.parsed_attachments().unwrap_or_default(),
            is_read: row.is_read,
            created_at: row.created_at.clone(),
            sender,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
