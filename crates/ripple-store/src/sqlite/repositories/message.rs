//! Message repository — the append-only direct-message log.
//!
//! Rows are immutable after insert except for the `is_read` flag.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::sqlite::row_types::MessageRow;

/// Message repository — stateless, every method takes `&Connection`.
pub struct MessageRepo;

impl MessageRepo {
    const SELECT: &'static str = "SELECT id, conversation_id, sender_id, receiver_id, content,
                attachments, is_read, created_at
         FROM messages";

    /// Insert a new message row.
    pub fn insert(conn: &Connection, row: &MessageRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO messages (id, conversation_id, sender_id, receiver_id,
                 content, attachments, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.id,
                row.conversation_id,
                row.sender_id,
                row.receiver_id,
                row.content,
                row.attachments,
                i64::from(row.is_read),
                row.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a message by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<MessageRow>> {
        let row = conn
            .query_row(
                &format!("{} WHERE id = ?1", Self::SELECT),
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Page of messages for a conversation, newest first.
    pub fn page_for_conversation(
        conn: &Connection,
        conversation_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE conversation_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3",
            Self::SELECT
        ))?;
        let rows = stmt
            .query_map(params![conversation_id, limit, offset], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Total message count for a conversation.
    pub fn count_for_conversation(conn: &Connection, conversation_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Flip a single message's read flag. Returns whether a row changed
    /// (false when already read or missing).
    pub fn mark_read(conn: &Connection, id: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE messages SET is_read = 1 WHERE id = ?1 AND is_read = 0",
            params![id],
        )?;
        Ok(changed > 0)
    }

    /// Flip the read flag on every unread message addressed to `reader` in
    /// the conversation. Returns how many rows changed. Idempotent.
    pub fn mark_conversation_read(
        conn: &Connection,
        conversation_id: &str,
        reader: &str,
    ) -> Result<usize> {
        let changed = conn.execute(
            "UPDATE messages SET is_read = 1
             WHERE conversation_id = ?1 AND receiver_id = ?2 AND is_read = 0",
            params![conversation_id, reader],
        )?;
        Ok(changed)
    }

    /// Map a rusqlite row to `MessageRow`.
    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
        Ok(MessageRow {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            sender_id: row.get(2)?,
            receiver_id: row.get(3)?,
            content: row.get(4)?,
            attachments: row.get(5)?,
            is_read: row.get::<_, i64>(6)? == 1,
            created_at: row.get(7)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
