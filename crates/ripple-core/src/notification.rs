//! Social-action notification kinds.

use serde::{Deserialize, Serialize};

/// What social action produced a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Someone liked a post.
    Like,
    /// Someone replied to a post.
    Reply,
    /// Someone mentioned the recipient in a post.
    Mention,
    /// Someone followed the recipient.
    Follow,
}

impl NotificationKind {
    /// Stable string form used in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Reply => "reply",
            Self::Mention => "mention",
            Self::Follow => "follow",
        }
    }

    /// Parse from the database string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(Self::Like),
            "reply" => Some(Self::Reply),
            "mention" => Some(Self::Mention),
            "follow" => Some(Self::Follow),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_roundtrips_through_parse() {
        for kind in [
            NotificationKind::Like,
            NotificationKind::Reply,
            NotificationKind::Mention,
            NotificationKind::Follow,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn parse_unknown_returns_none() {
        assert_eq!(NotificationKind::parse("repost"), None);
        assert_eq!(NotificationKind::parse(""), None);
    }

    #[test]
    fn serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&NotificationKind::Follow).unwrap(),
            "\"follow\""
        );
        let back: NotificationKind = serde_json::from_str("\"mention\"").unwrap();
        assert_eq!(back, NotificationKind::Mention);
    }
}
