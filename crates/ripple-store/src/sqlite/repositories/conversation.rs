//! Conversation repository — pair-keyed aggregate rows and per-participant
//! member state.
//!
//! The unordered participant pair is canonicalized via [`canonical_pair`]
//! before any lookup or insert, so `(a, b)` and `(b, a)` always address the
//! same row. Counter updates are done storage-side (`unread_count =
//! unread_count + 1`) rather than read-then-write.

use rusqlite::{Connection, OptionalExtension, params};

use ripple_core::ConversationId;

use crate::errors::{Result, StoreError};
use crate::sqlite::row_types::{ConversationRow, MemberRow};

/// Order a participant pair canonically (lexicographically).
pub fn canonical_pair<'a>(x: &'a str, y: &'a str) -> (&'a str, &'a str) {
    if x <= y { (x, y) } else { (y, x) }
}

/// Conversation repository — stateless, every method takes `&Connection`.
pub struct ConversationRepo;

impl ConversationRepo {
    const SELECT: &'static str = "SELECT id, participant_a, participant_b, last_message_id,
                last_message_text, last_message_at, created_at, updated_at
         FROM conversations";

    /// Find the conversation for an unordered participant pair.
    pub fn find_by_pair(conn: &Connection, x: &str, y: &str) -> Result<Option<ConversationRow>> {
        let (a, b) = canonical_pair(x, y);
        let row = conn
            .query_row(
                &format!("{} WHERE participant_a = ?1 AND participant_b = ?2", Self::SELECT),
                params![a, b],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Create the conversation for a pair along with its two member rows.
    ///
    /// Fails on the UNIQUE constraint if the pair already has one; callers
    /// use find-or-create under the pair write lock.
    pub fn create(conn: &Connection, x: &str, y: &str) -> Result<ConversationRow> {
        let (a, b) = canonical_pair(x, y);
        let id = ConversationId::new().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO conversations (id, participant_a, participant_b, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, a, b, now],
        )?;
        for user in [a, b] {
            let _ = conn.execute(
                "INSERT INTO conversation_members (conversation_id, user_id) VALUES (?1, ?2)",
                params![id, user],
            )?;
        }
        Self::get(conn, &id)?.ok_or_else(|| StoreError::ConversationNotFound(id))
    }

    /// Get a conversation by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<ConversationRow>> {
        let row = conn
            .query_row(
                &format!("{} WHERE id = ?1", Self::SELECT),
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Update the denormalized last-message snapshot.
    pub fn set_last_message(
        conn: &Connection,
        id: &str,
        message_id: &str,
        preview: &str,
        at: &str,
    ) -> Result<()> {
        let _ = conn.execute(
            "UPDATE conversations
             SET last_message_id = ?1, last_message_text = ?2, last_message_at = ?3,
                 updated_at = ?3
             WHERE id = ?4",
            params![message_id, preview, at, id],
        )?;
        Ok(())
    }

    /// Atomically increment a participant's unread counter.
    pub fn increment_unread(conn: &Connection, id: &str, user: &str) -> Result<()> {
        let _ = conn.execute(
            "UPDATE conversation_members SET unread_count = unread_count + 1
             WHERE conversation_id = ?1 AND user_id = ?2",
            params![id, user],
        )?;
        Ok(())
    }

    /// Reset a participant's unread counter to zero. Idempotent.
    pub fn reset_unread(conn: &Connection, id: &str, user: &str) -> Result<()> {
        let _ = conn.execute(
            "UPDATE conversation_members SET unread_count = 0
             WHERE conversation_id = ?1 AND user_id = ?2",
            params![id, user],
        )?;
        Ok(())
    }

    /// Flip a participant's pinned flag. Returns the new value.
    pub fn toggle_pinned(conn: &Connection, id: &str, user: &str) -> Result<bool> {
        Self::toggle_flag(conn, id, user, "pinned")
    }

    /// Flip a participant's muted flag. Returns the new value.
    pub fn toggle_muted(conn: &Connection, id: &str, user: &str) -> Result<bool> {
        Self::toggle_flag(conn, id, user, "muted")
    }

    fn toggle_flag(conn: &Connection, id: &str, user: &str, column: &str) -> Result<bool> {
        // column is one of the two compile-time literals above, never user input
        let changed = conn.execute(
            &format!(
                "UPDATE conversation_members SET {column} = 1 - {column}
                 WHERE conversation_id = ?1 AND user_id = ?2"
            ),
            params![id, user],
        )?;
        if changed == 0 {
            return Err(StoreError::NotAParticipant {
                user: user.to_owned(),
                conversation: id.to_owned(),
            });
        }
        let value: i64 = conn.query_row(
            &format!(
                "SELECT {column} FROM conversation_members
                 WHERE conversation_id = ?1 AND user_id = ?2"
            ),
            params![id, user],
            |row| row.get(0),
        )?;
        Ok(value == 1)
    }

    /// Get one participant's member state.
    pub fn member(conn: &Connection, id: &str, user: &str) -> Result<Option<MemberRow>> {
        let row = conn
            .query_row(
                "SELECT conversation_id, user_id, unread_count, pinned, muted
                 FROM conversation_members
                 WHERE conversation_id = ?1 AND user_id = ?2",
                params![id, user],
                Self::map_member,
            )
            .optional()?;
        Ok(row)
    }

    /// List a participant's conversations with their member state, pinned
    /// first, then most recently active.
    pub fn list_for_user(
        conn: &Connection,
        user: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<(ConversationRow, MemberRow)>> {
        let mut stmt = conn.prepare(
            "SELECT c.id, c.participant_a, c.participant_b, c.last_message_id,
                    c.last_message_text, c.last_message_at, c.created_at, c.updated_at,
                    m.conversation_id, m.user_id, m.unread_count, m.pinned, m.muted
             FROM conversations c
             JOIN conversation_members m ON m.conversation_id = c.id
             WHERE m.user_id = ?1
             ORDER BY m.pinned DESC, c.last_message_at DESC, c.created_at DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
            .query_map(params![user, limit, offset], |row| {
                let conversation = Self::map_row(row)?;
                let member = MemberRow {
                    conversation_id: row.get(8)?,
                    user_id: row.get(9)?,
                    unread_count: row.get(10)?,
                    pinned: row.get::<_, i64>(11)? == 1,
                    muted: row.get::<_, i64>(12)? == 1,
                };
                Ok((conversation, member))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Total number of conversations the user participates in.
    pub fn count_for_user(conn: &Connection, user: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM conversation_members WHERE user_id = ?1",
            params![user],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a conversation. Member rows and messages cascade.
    /// Returns whether a row was removed.
    pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
        let changed = conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Map a rusqlite row to `ConversationRow`.
    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
        Ok(ConversationRow {
            id: row.get(0)?,
            participant_a: row.get(1)?,
            participant_b: row.get(2)?,
            last_message_id: row.get(3)?,
            last_message_text: row.get(4)?,
            last_message_at: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn map_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemberRow> {
        Ok(MemberRow {
            conversation_id: row.get(0)?,
            user_id: row.get(1)?,
            unread_count: row.get(2)?,
            pinned: row.get::<_, i64>(3)? == 1,
            muted: row.get::<_, i64>(4)? == 1,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::sqlite::migrations::run_migrations;
    use crate::sqlite::repositories::user::UserRepo;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
            .unwrap();
        run_migrations(&conn).unwrap();
        for (id, name) in [("u1", "ada"), ("u2", "grace"), ("u3", "edsger")] {
            UserRepo::upsert(&conn, id, name, None, None).unwrap();
        }
        conn
    }

    #[test]
    fn canonical_pair_orders() {
        assert_eq!(canonical_pair("b", "a"), ("a", "b"));
        assert_eq!(canonical_pair("a", "b"), ("a", "b"));
        assert_eq!(canonical_pair("x", "x"), ("x", "x"));
    }

    #[test]
    fn create_stores_canonical_order() {
        let conn = setup();
        // Pass in reversed order; stored canonically
        let conv = ConversationRepo::create(&conn, "u2", "u1").unwrap();
        assert_eq!(conv.participant_a, "u1");
        assert_eq!(conv.participant_b, "u2");
    }

    #[test]
    fn create_adds_two_member_rows() {
        let conn = setup();
        let conv = ConversationRepo::create(&conn, "u1", "u2").unwrap();

        let m1 = ConversationRepo::member(&conn, &conv.id, "u1").unwrap().unwrap();
        let m2 = ConversationRepo::member(&conn, &conv.id, "u2").unwrap().unwrap();
        assert_eq!(m1.unread_count, 0);
        assert!(!m1.pinned);
        assert!(!m2.muted);
    }

    #[test]
    fn find_by_pair_either_order() {
        let conn = setup();
        let created = ConversationRepo::create(&conn, "u1", "u2").unwrap();

        let found_ab = ConversationRepo::find_by_pair(&conn, "u1", "u2").unwrap().unwrap();
        let found_ba = ConversationRepo::find_by_pair(&conn, "u2", "u1").unwrap().unwrap();
        assert_eq!(found_ab.id, created.id);
        assert_eq!(found_ba.id, created.id);
    }

    #[test]
    fn find_by_pair_missing() {
        let conn = setup();
        assert!(ConversationRepo::find_by_pair(&conn, "u1", "u3").unwrap().is_none());
    }

    #[test]
    fn set_last_message_updates_snapshot() {
        let conn = setup();
        let conv = ConversationRepo::create(&conn, "u1", "u2").unwrap();
        ConversationRepo::set_last_message(&conn, &conv.id, "m1", "hello", "2026-02-01T00:00:00Z")
            .unwrap();

        let updated = ConversationRepo::get(&conn, &conv.id).unwrap().unwrap();
        assert_eq!(updated.last_message_id.as_deref(), Some("m1"));
        assert_eq!(updated.last_message_text, "hello");
        assert_eq!(updated.last_message_at.as_deref(), Some("2026-02-01T00:00:00Z"));
        assert_eq!(updated.updated_at, "2026-02-01T00:00:00Z");
    }

    #[test]
    fn increment_unread_is_per_participant() {
        let conn = setup();
        let conv = ConversationRepo::create(&conn, "u1", "u2").unwrap();
        ConversationRepo::increment_unread(&conn, &conv.id, "u2").unwrap();
        ConversationRepo::increment_unread(&conn, &conv.id, "u2").unwrap();

        let m1 = ConversationRepo::member(&conn, &conv.id, "u1").unwrap().unwrap();
        let m2 = ConversationRepo::member(&conn, &conv.id, "u2").unwrap().unwrap();
        assert_eq!(m1.unread_count, 0);
        assert_eq!(m2.unread_count, 2);
    }

    #[test]
    fn reset_unread_idempotent() {
        let conn = setup();
        let conv = ConversationRepo::create(&conn, "u1", "u2").unwrap();
        ConversationRepo::increment_unread(&conn, &conv.id, "u2").unwrap();

        ConversationRepo::reset_unread(&conn, &conv.id, "u2").unwrap();
        ConversationRepo::reset_unread(&conn, &conv.id, "u2").unwrap();

        let m2 = ConversationRepo::member(&conn, &conv.id, "u2").unwrap().unwrap();
        assert_eq!(m2.unread_count, 0);
    }

    #[test]
    fn toggle_pinned_flips_and_returns_new_value() {
        let conn = setup();
        let conv = ConversationRepo::create(&conn, "u1", "u2").unwrap();

        assert!(ConversationRepo::toggle_pinned(&conn, &conv.id, "u1").unwrap());
        assert!(!ConversationRepo::toggle_pinned(&conn, &conv.id, "u1").unwrap());
    }

    #[test]
    fn toggle_pinned_is_participant_scoped() {
        let conn = setup();
        let conv = ConversationRepo::create(&conn, "u1", "u2").unwrap();
        ConversationRepo::toggle_pinned(&conn, &conv.id, "u1").unwrap();

        let m2 = ConversationRepo::member(&conn, &conv.id, "u2").unwrap().unwrap();
        assert!(!m2.pinned, "toggling u1's pin must not affect u2");
    }

    #[test]
    fn toggle_muted_is_participant_scoped() {
        let conn = setup();
        let conv = ConversationRepo::create(&conn, "u1", "u2").unwrap();
        assert!(ConversationRepo::toggle_muted(&conn, &conv.id, "u2").unwrap());

        let m1 = ConversationRepo::member(&conn, &conv.id, "u1").unwrap().unwrap();
        assert!(!m1.muted);
    }

    #[test]
    fn toggle_by_non_participant_errors() {
        let conn = setup();
        let conv = ConversationRepo::create(&conn, "u1", "u2").unwrap();

        let err = ConversationRepo::toggle_pinned(&conn, &conv.id, "u3").unwrap_err();
        assert!(matches!(err, StoreError::NotAParticipant { .. }));
    }

    #[test]
    fn list_for_user_orders_pinned_first() {
        let conn = setup();
        let c12 = ConversationRepo::create(&conn, "u1", "u2").unwrap();
        let c13 = ConversationRepo::create(&conn, "u1", "u3").unwrap();

        // c13 is more recent, but c12 is pinned by u1
        ConversationRepo::set_last_message(&conn, &c12.id, "m1", "old", "2026-01-01T00:00:00Z").unwrap();
        ConversationRepo::set_last_message(&conn, &c13.id, "m2", "new", "2026-02-01T00:00:00Z").unwrap();
        ConversationRepo::toggle_pinned(&conn, &c12.id, "u1").unwrap();

        let list = ConversationRepo::list_for_user(&conn, "u1", 10, 0).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].0.id, c12.id);
        assert_eq!(list[1].0.id, c13.id);
    }

    #[test]
    fn list_for_user_pagination() {
        let conn = setup();
        ConversationRepo::create(&conn, "u1", "u2").unwrap();
        ConversationRepo::create(&conn, "u1", "u3").unwrap();

        let page1 = ConversationRepo::list_for_user(&conn, "u1", 1, 0).unwrap();
        let page2 = ConversationRepo::list_for_user(&conn, "u1", 1, 1).unwrap();
        assert_eq!(page1.len(), 1);
        assert_eq!(page2.len(), 1);
        assert_ne!(page1[0].0.id, page2[0].0.id);
        assert_eq!(ConversationRepo::count_for_user(&conn, "u1").unwrap(), 2);
    }

    #[test]
    fn delete_removes_row() {
        let conn = setup();
        let conv = ConversationRepo::create(&conn, "u1", "u2").unwrap();

        assert!(ConversationRepo::delete(&conn, &conv.id).unwrap());
        assert!(ConversationRepo::get(&conn, &conv.id).unwrap().is_none());
        assert!(ConversationRepo::member(&conn, &conv.id, "u1").unwrap().is_none());
    }

    #[test]
    fn delete_missing_returns_false() {
        let conn = setup();
        assert!(!ConversationRepo::delete(&conn, "nope").unwrap());
    }
}
