//! User repository — minimal profile rows for display enrichment.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::sqlite::row_types::UserRow;

/// User repository — stateless, every method takes `&Connection`.
pub struct UserRepo;

impl UserRepo {
    /// Insert or update a profile row. The row is keyed by the account
    /// system's user ID; repeated upserts refresh the display fields.
    pub fn upsert(
        conn: &Connection,
        id: &str,
        username: &str,
        display_name: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO users (id, username, display_name, avatar, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 username = excluded.username,
                 display_name = excluded.display_name,
                 avatar = excluded.avatar",
            params![id, username, display_name, avatar, now],
        )?;
        Ok(())
    }

    /// Get a user by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
        let row = conn
            .query_row(
                "SELECT id, username, display_name, avatar, created_at
                 FROM users WHERE id = ?1",
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Map a rusqlite row to `UserRow`.
    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
        Ok(UserRow {
            id: row.get(0)?,
            username: row.get(1)?,
            display_name: row.get(2)?,
            avatar: row.get(3)?,
            created_at: row.get(4)?,
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

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
            .unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn upsert_and_get() {
        let conn = setup();
        UserRepo::upsert(&conn, "u1", "ada", Some("Ada L."), Some("/a.png")).unwrap();

        let row = UserRepo::get(&conn, "u1").unwrap().unwrap();
        assert_eq!(row.username, "ada");
        assert_eq!(row.display_name.as_deref(), Some("Ada L."));
        assert_eq!(row.avatar.as_deref(), Some("/a.png"));
    }

    #[test]
    fn get_missing_returns_none() {
        let conn = setup();
        assert!(UserRepo::get(&conn, "ghost").unwrap().is_none());
    }

    #[test]
    fn upsert_updates_existing() {
        let conn = setup();
        UserRepo::upsert(&conn, "u1", "ada", None, None).unwrap();
        UserRepo::upsert(&conn, "u1", "ada", Some("Ada Lovelace"), None).unwrap();

        let row = UserRepo::get(&conn, "u1").unwrap().unwrap();
        assert_eq!(row.display_name.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn username_unique() {
        let conn = setup();
        UserRepo::upsert(&conn, "u1", "ada", None, None).unwrap();
        let result = UserRepo::upsert(&conn, "u2", "ada", None, None);
        assert!(result.is_err());
    }
}
