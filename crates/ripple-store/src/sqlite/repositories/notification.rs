//! Notification repository — social-action records (like/reply/mention/follow).

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::sqlite::row_types::NotificationRow;

/// Notification repository — stateless, every method takes `&Connection`.
pub struct NotificationRepo;

impl NotificationRepo {
    const SELECT: &'static str = "SELECT id, recipient_id, sender_id, kind, post_id, body, is_read, created_at
         FROM notifications";

    /// Insert a new notification row.
    pub fn insert(conn: &Connection, row: &NotificationRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO notifications (id, recipient_id, sender_id, kind, post_id,
                 body, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.id,
                row.recipient_id,
                row.sender_id,
                row.kind,
                row.post_id,
                row.body,
                i64::from(row.is_read),
                row.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a notification by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<NotificationRow>> {
        let row = conn
            .query_row(
                &format!("{} WHERE id = ?1", Self::SELECT),
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Page of a recipient's notifications, newest first.
    pub fn page_for_recipient(
        conn: &Connection,
        recipient: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE recipient_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3",
            Self::SELECT
        ))?;
        let rows = stmt
            .query_map(params![recipient, limit, offset], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Total notification count for a recipient.
    pub fn count_for_recipient(conn: &Connection, recipient: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1",
            params![recipient],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Unread notification count for a recipient.
    pub fn unread_count(conn: &Connection, recipient: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0",
            params![recipient],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Flip a notification's read flag. Returns whether a row changed.
    pub fn mark_read(conn: &Connection, id: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND is_read = 0",
            params![id],
        )?;
        Ok(changed > 0)
    }

    /// Map a rusqlite row to `NotificationRow`.
    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRow> {
        Ok(NotificationRow {
            id: row.get(0)?,
            recipient_id: row.get(1)?,
            sender_id: row.get(2)?,
            kind: row.get(3)?,
            post_id: row.get(4)?,
            body: row.get(5)?,
            is_read: row.get::<_, i64>(6)? == 1,
            created_at: row.get(7)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
