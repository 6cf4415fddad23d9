//! Push subscription repository — one row per `(user, endpoint)` pair.
//!
//! Rows are created on client opt-in and deleted on explicit unsubscribe or
//! when a delivery attempt reports the endpoint permanently gone.

use rusqlite::{Connection, OptionalExtension, params};

use ripple_core::SubscriptionId;

use crate::errors::Result;
use crate::sqlite::row_types::PushSubscriptionRow;

/// Result of upserting a subscription.
#[derive(Debug)]
pub struct SubscriptionUpsert {
    /// The subscription row ID.
    pub id: String,
    /// Whether a new row was created (vs. refreshed existing).
    pub created: bool,
}

/// Push subscription repository — stateless, every method takes `&Connection`.
pub struct PushSubscriptionRepo;

impl PushSubscriptionRepo {
    /// Register or refresh a subscription. Returns `{id, created}`.
    ///
    /// If the `(user, endpoint)` pair already exists, refreshes the client
    /// keys in place. Otherwise inserts a new row.
    pub fn upsert(
        conn: &Connection,
        user: &str,
        endpoint: &str,
        key_p256dh: &str,
        key_auth: &str,
    ) -> Result<SubscriptionUpsert> {
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM push_subscriptions WHERE user_id = ?1 AND endpoint = ?2",
                params![user, endpoint],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            let _ = conn.execute(
                "UPDATE push_subscriptions SET key_p256dh = ?1, key_auth = ?2 WHERE id = ?3",
                params![key_p256dh, key_auth, id],
            )?;
            Ok(SubscriptionUpsert { id, created: false })
        } else {
            let id = SubscriptionId::new().to_string();
            let now = chrono::Utc::now().to_rfc3339();
            let _ = conn.execute(
                "INSERT INTO push_subscriptions (id, user_id, endpoint, key_p256dh, key_auth, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, user, endpoint, key_p256dh, key_auth, now],
            )?;
            Ok(SubscriptionUpsert { id, created: true })
        }
    }

    /// Delete a subscription. Returns whether a row was removed.
    pub fn remove(conn: &Connection, user: &str, endpoint: &str) -> Result<bool> {
        let changed = conn.execute(
            "DELETE FROM push_subscriptions WHERE user_id = ?1 AND endpoint = ?2",
            params![user, endpoint],
        )?;
        Ok(changed > 0)
    }

    /// All subscriptions for a user.
    pub fn for_user(conn: &Connection, user: &str) -> Result<Vec<PushSubscriptionRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, endpoint, key_p256dh, key_auth, created_at
             FROM push_subscriptions WHERE user_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![user], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Map a rusqlite row to `PushSubscriptionRow`.
    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PushSubscriptionRow> {
        Ok(PushSubscriptionRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            endpoint: row.get(2)?,
            key_p256dh: row.get(3)?,
            key_auth: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
