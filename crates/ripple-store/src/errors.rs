//! Error types for the persistence subsystem.
//!
//! [`StoreError`] is the primary error type returned by all store
//! operations. It provides specific variants for common failure modes while
//! keeping the surface area small enough for exhaustive pattern matching.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// Requested conversation was not found.
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    /// Requested message was not found.
    #[error("message not found: {0}")]
    MessageNotFound(String),

    /// Requested notification was not found.
    #[error("notification not found: {0}")]
    NotificationNotFound(String),

    /// Requested user was not found.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// The acting user is not a participant of the conversation.
    #[error("user {user} is not a participant of conversation {conversation}")]
    NotAParticipant {
        /// Acting user.
        user: String,
        /// Conversation being acted on.
        conversation: String,
    },

    /// Invalid operation on the store.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Internal error (e.g. poisoned lock).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_error_display() {
        let err = StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.to_string().contains("sqlite error"));
    }

    #[test]
    fn serde_error_display() {
        let serde_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err = StoreError::Serde(serde_err);
        assert!(err.to_string().contains("serde error"));
    }

    #[test]
    fn migration_error_display() {
        let err = StoreError::Migration {
            message: "v001 failed: table already exists".into(),
        };
        assert_eq!(
            err.to_string(),
            "migration error: v001 failed: table already exists"
        );
    }

    #[test]
    fn conversation_not_found_display() {
        let err = StoreError::ConversationNotFound("conv-123".into());
        assert_eq!(err.to_string(), "conversation not found: conv-123");
    }

    #[test]
    fn message_not_found_display() {
        let err = StoreError::MessageNotFound("msg-456".into());
        assert_eq!(err.to_string(), "message not found: msg-456");
    }

    #[test]
    fn not_a_participant_display() {
        let err = StoreError::NotAParticipant {
            user: "u1".into(),
            conversation: "c1".into(),
        };
        assert_eq!(
            err.to_string(),
            "user u1 is not a participant of conversation c1"
        );
    }

    #[test]
    fn from_rusqlite_error() {
        let sqlite_err = rusqlite::Error::QueryReturnedNoRows;
        let err: StoreError = sqlite_err.into();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn from_serde_error() {
        let serde_err = serde_json::from_str::<String>("bad").unwrap_err();
        let err: StoreError = serde_err.into();
        assert!(matches!(err, StoreError::Serde(_)));
    }

    #[test]
    fn result_alias() {
        fn example() -> Result<String> {
            Ok("hello".into())
        }
        assert_eq!(example().unwrap(), "hello");
    }
}
