//! Participant-scoped conversation views.
//!
//! A conversation row plus the requesting participant's member state project
//! into the shape clients render. The projection is a pure read-side
//! transform applied identically by the list query and the single fetch.

use serde::Serialize;

use crate::sqlite::row_types::{ConversationRow, MemberRow};

/// A conversation as seen by one participant.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    /// Conversation ID.
    pub id: String,
    /// The participant on the other side of the requester.
    pub other_participant: String,
    /// Most recent message ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<String>,
    /// Denormalized last-message preview text.
    pub last_message_text: String,
    /// Timestamp of the last message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<String>,
    /// The requester's unread message count.
    pub unread_count: i64,
    /// Whether the requester pinned the conversation.
    pub is_pinned: bool,
    /// Whether the requester muted the conversation.
    pub is_muted: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl ConversationView {
    /// Project a conversation and the requester's member state into the
    /// requester's view.
    ///
    /// Returns `None` when the requester is not a participant or the member
    /// row belongs to someone else.
    pub fn project(
        conversation: &ConversationRow,
        member: &MemberRow,
        requester: &str,
    ) -> Option<Self> {
        if member.user_id != requester || member.conversation_id != conversation.id {
            return None;
        }
        let other = conversation.other_participant(requester)?;
        Some(Self {
            id: conversation.id.clone(),
            other_participant: other.to_owned(),
            last_message_id: conversation.last_message_id.clone(),
            last_message_text: conversation.last_message_text.clone(),
            last_message_at: conversation.last_message_at.clone(),
            unread_count: member.unread_count,
            is_pinned: member.pinned,
            is_muted: member.muted,
            created_at: conversation.created_at.clone(),
            updated_at: conversation.updated_at.clone(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_rows() -> (ConversationRow, MemberRow, MemberRow) {
        let conversation = ConversationRow {
            id: "c1".into(),
            participant_a: "u1".into(),
            participant_b: "u2".into(),
            last_message_id: Some("m9".into()),
            last_message_text: "latest".into(),
            last_message_at: Some("2026-02-01T00:00:00Z".into()),
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-02-01T00:00:00Z".into(),
        };
        let m1 = MemberRow {
            conversation_id: "c1".into(),
            user_id: "u1".into(),
            unread_count: 0,
            pinned: true,
            muted: false,
        };
        let m2 = MemberRow {
            conversation_id: "c1".into(),
            user_id: "u2".into(),
            unread_count: 3,
            pinned: false,
            muted: true,
        };
        (conversation, m1, m2)
    }

    #[test]
    fn projection_is_requester_scoped() {
        let (conversation, m1, m2) = make_rows();

        let v1 = ConversationView::project(&conversation, &m1, "u1").unwrap();
        assert_eq!(v1.other_participant, "u2");
        assert_eq!(v1.unread_count, 0);
        assert!(v1.is_pinned);
        assert!(!v1.is_muted);

        let v2 = ConversationView::project(&conversation, &m2, "u2").unwrap();
        assert_eq!(v2.other_participant, "u1");
        assert_eq!(v2.unread_count, 3);
        assert!(!v2.is_pinned);
        assert!(v2.is_muted);
    }

    #[test]
    fn projection_rejects_mismatched_member() {
        let (conversation, m1, _) = make_rows();
        // u2 asking with u1's member row must not leak u1's state
        assert!(ConversationView::project(&conversation, &m1, "u2").is_none());
    }

    #[test]
    fn projection_rejects_non_participant() {
        let (conversation, _, _) = make_rows();
        let outsider = MemberRow {
            conversation_id: "c1".into(),
            user_id: "u3".into(),
            unread_count: 0,
            pinned: false,
            muted: false,
        };
        assert!(ConversationView::project(&conversation, &outsider, "u3").is_none());
    }

    #[test]
    fn serializes_camel_case() {
        let (conversation, m1, _) = make_rows();
        let view = ConversationView::project(&conversation, &m1, "u1").unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["otherParticipant"], "u2");
        assert_eq!(json["lastMessageText"], "latest");
        assert_eq!(json["unreadCount"], 0);
        assert_eq!(json["isPinned"], true);
        assert_eq!(json["isMuted"], false);
    }
}
