//! Database row types for mapping between `SQLite` rows and Rust structs.
//!
//! These represent the raw database row shape — not the wire format.
//! Conversion to outbound payloads (participant-scoped views, enriched
//! messages) happens in the view layer and in `ripple-server`.

use serde::{Deserialize, Serialize};

use ripple_core::MediaAttachment;

use crate::errors::Result;

/// Raw user row from the `users` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserRow {
    /// User ID.
    pub id: String,
    /// Unique handle.
    pub username: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Avatar reference.
    pub avatar: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

/// Raw conversation row from the `conversations` table.
///
/// `participant_a < participant_b` always holds (canonical pair order).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationRow {
    /// Conversation ID.
    pub id: String,
    /// Lexicographically smaller participant.
    pub participant_a: String,
    /// Lexicographically larger participant.
    pub participant_b: String,
    /// Most recent message ID.
    pub last_message_id: Option<String>,
    /// Denormalized last-message preview text.
    pub last_message_text: String,
    /// Timestamp of the last message.
    pub last_message_at: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl ConversationRow {
    /// The participant on the other side of `user`, if `user` is a member.
    pub fn other_participant(&self, user: &str) -> Option<&str> {
        if self.participant_a == user {
            Some(&self.participant_b)
        } else if self.participant_b == user {
            Some(&self.participant_a)
        } else {
            None
        }
    }

    /// Whether `user` is one of the two participants.
    pub fn has_participant(&self, user: &str) -> bool {
        self.participant_a == user || self.participant_b == user
    }
}

/// Raw per-participant state row from the `conversation_members` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemberRow {
    /// Conversation ID.
    pub conversation_id: String,
    /// Participant this state belongs to.
    pub user_id: String,
    /// Unread message count for this participant.
    pub unread_count: i64,
    /// Whether this participant pinned the conversation.
    pub pinned: bool,
    /// Whether this participant muted the conversation.
    pub muted: bool,
}

/// Raw message row from the `messages` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageRow {
    /// Message ID.
    pub id: String,
    /// Conversation this message belongs to.
    pub conversation_id: String,
    /// Sending user.
    pub sender_id: String,
    /// Receiving user.
    pub receiver_id: String,
    /// Text content (may be empty when attachments are present).
    pub content: String,
    /// Attachments as a JSON array string.
    pub attachments: String,
    /// Whether the receiver has read this message.
    pub is_read: bool,
    /// Creation timestamp.
    pub created_at: String,
}

impl MessageRow {
    /// Parse the attachments JSON column.
    pub fn parsed_attachments(&self) -> Result<Vec<MediaAttachment>> {
        Ok(serde_json::from_str(&self.attachments)?)
    }
}

/// Raw notification row from the `notifications` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationRow {
    /// Notification ID.
    pub id: String,
    /// Recipient user.
    pub recipient_id: String,
    /// User whose action produced the notification.
    pub sender_id: String,
    /// Action kind (`like`, `reply`, `mention`, `follow`).
    pub kind: String,
    /// Referenced post, when the kind concerns one.
    pub post_id: Option<String>,
    /// Human-readable notification text.
    pub body: String,
    /// Whether the recipient has read this notification.
    pub is_read: bool,
    /// Creation timestamp.
    pub created_at: String,
}

/// Raw push subscription row from the `push_subscriptions` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushSubscriptionRow {
    /// Subscription ID.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Client public key (p256dh).
    pub key_p256dh: String,
    /// Client auth secret.
    pub key_auth: String,
    /// Creation timestamp.
    pub created_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::MediaKind;

    fn make_conversation() -> ConversationRow {
        ConversationRow {
            id: "c1".into(),
            participant_a: "u1".into(),
            participant_b: "u2".into(),
            last_message_id: None,
            last_message_text: String::new(),
            last_message_at: None,
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn other_participant_both_sides() {
        let conv = make_conversation();
        assert_eq!(conv.other_participant("u1"), Some("u2"));
        assert_eq!(conv.other_participant("u2"), Some("u1"));
    }

    #[test]
    fn other_participant_non_member() {
        let conv = make_conversation();
        assert_eq!(conv.other_participant("u3"), None);
    }

    #[test]
    fn has_participant() {
        let conv = make_conversation();
        assert!(conv.has_participant("u1"));
        assert!(conv.has_participant("u2"));
        assert!(!conv.has_participant("u3"));
    }

    #[test]
    fn parsed_attachments_empty() {
        let msg = MessageRow {
            id: "m1".into(),
            conversation_id: "c1".into(),
            sender_id: "u1".into(),
            receiver_id: "u2".into(),
            content: "hi".into(),
            attachments: "[]".into(),
            is_read: false,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        assert!(msg.parsed_attachments().unwrap().is_empty());
    }

    #[test]
    fn parsed_attachments_roundtrip() {
        let attachments = vec![MediaAttachment {
            kind: MediaKind::Image,
            url: "/uploads/a.jpg".into(),
            caption: None,
        }];
        let json = serde_json::to_string(&attachments).unwrap();
        let msg = MessageRow {
            id: "m1".into(),
            conversation_id: "c1".into(),
            sender_id: "u1".into(),
            receiver_id: "u2".into(),
            content: String::new(),
            attachments: json,
            is_read: false,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        let parsed = msg.parsed_attachments().unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].kind, MediaKind::Image);
    }

    #[test]
    fn parsed_attachments_invalid_json_errors() {
        let msg = MessageRow {
            id: "m1".into(),
            conversation_id: "c1".into(),
            sender_id: "u1".into(),
            receiver_id: "u2".into(),
            content: String::new(),
            attachments: "not json".into(),
            is_read: false,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        assert!(msg.parsed_attachments().is_err());
    }
}
