//! In-memory presence registry — the single source of truth for "is this
//! user online right now" in this process.
//!
//! One live connection per user: a later registration for the same user
//! replaces the earlier one and all delivery follows the newest connection.
//! Nothing is persisted; a process restart empties the registry and every
//! client re-registers on reconnect.
//!
//! Registration and removal broadcast `user_status` events to every other
//! connected peer. The broadcast is unscoped, which is acceptable at the
//! target user-base scale; sharding presence across processes requires an
//! external registry behind this same interface.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::{counter, gauge};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use ripple_core::UserId;

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_SEND_DROPS_TOTAL};
use crate::realtime::events::{self, ServerEvent};

use super::connection::ClientConnection;

/// Maximum total lifetime event drops before forcibly deregistering a slow
/// client.
const MAX_TOTAL_DROPS: u64 = 100;

/// Tracks which users currently have a live connection.
pub struct PresenceRegistry {
    /// Live connections indexed by user ID.
    sessions: RwLock<HashMap<String, Arc<ClientConnection>>>,
    /// Atomic counter tracking online users (avoids read-locking for counts).
    online_count: AtomicUsize,
}

impl PresenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            online_count: AtomicUsize::new(0),
        }
    }

    /// Record or replace the live connection for a user.
    ///
    /// Returns the replaced connection when the user was already online on
    /// another connection (last registration wins).
    pub async fn register(&self, connection: Arc<ClientConnection>) -> Option<Arc<ClientConnection>> {
        let user = connection.user_id.to_string();
        let mut sessions = self.sessions.write().await;
        let replaced = sessions.insert(user.clone(), connection);
        if replaced.is_none() {
            let _ = self.online_count.fetch_add(1, Ordering::Relaxed);
            gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
        }
        debug!(user_id = %user, replaced = replaced.is_some(), "session registered");
        replaced
    }

    /// Remove a user's session on disconnect. No-op when absent.
    ///
    /// Only removes the entry when it still belongs to `connection_id` — a
    /// stale disconnect must not evict a newer registration from another
    /// device.
    pub async fn remove(&self, user_id: &UserId, connection_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(user_id.as_str()) {
            Some(current) if current.id == connection_id => {
                let _ = sessions.remove(user_id.as_str());
                let _ = self.online_count.fetch_sub(1, Ordering::Relaxed);
                gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
                debug!(user_id = %user_id, "session removed");
                true
            }
            _ => false,
        }
    }

    /// Whether a user currently has a live connection.
    pub async fn is_online(&self, user_id: &UserId) -> bool {
        self.sessions.read().await.contains_key(user_id.as_str())
    }

    /// Online status for a batch of users.
    pub async fn online_status_batch(&self, user_ids: &[UserId]) -> HashMap<String, bool> {
        let sessions = self.sessions.read().await;
        user_ids
            .iter()
            .map(|id| (id.to_string(), sessions.contains_key(id.as_str())))
            .collect()
    }

    /// The live connection for a user, if any.
    pub async fn get(&self, user_id: &UserId) -> Option<Arc<ClientConnection>> {
        self.sessions.read().await.get(user_id.as_str()).cloned()
    }

    /// Number of users currently online.
    pub fn online_count(&self) -> usize {
        self.online_count.load(Ordering::Relaxed)
    }

    /// Send an event to one user's live connection.
    ///
    /// Returns `false` when the user is offline or the send was dropped.
    pub async fn send_to(&self, user_id: &UserId, event: &ServerEvent) -> bool {
        let Some(connection) = self.get(user_id).await else {
            return false;
        };
        let delivered = connection.send_event(event);
        if !delivered {
            counter!(WS_SEND_DROPS_TOTAL).increment(1);
            warn!(user_id = %user_id, event_type = %event.event_type, "live send dropped");
        }
        delivered
    }

    /// Broadcast a presence change to every connected peer except the
    /// subject.
    pub async fn broadcast_status(&self, user_id: &UserId, online: bool) {
        let status = if online { "online" } else { "offline" };
        let event = ServerEvent::new(
            events::USER_STATUS,
            serde_json::json!({ "userId": user_id.as_str(), "status": status }),
        );
        self.broadcast_except(user_id.as_str(), &event).await;
    }

    /// Serialize an event once and fan it out, deregistering slow clients
    /// that exceed the lifetime drop limit.
    async fn broadcast_except(&self, skip_user: &str, event: &ServerEvent) {
        let json = match serde_json::to_string(event) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(event_type = %event.event_type, error = %e, "failed to serialize event");
                return;
            }
        };
        let mut to_remove = Vec::new();
        {
            let sessions = self.sessions.read().await;
            let mut recipients = 0u32;
            for (user, connection) in sessions.iter() {
                if user == skip_user {
                    continue;
                }
                recipients += 1;
                if !connection.send(Arc::clone(&json)) {
                    counter!(WS_SEND_DROPS_TOTAL).increment(1);
                    let drops = connection.drop_count();
                    if drops >= MAX_TOTAL_DROPS {
                        warn!(user_id = %user, drops, "deregistering slow client");
                        to_remove.push((user.clone(), connection.id.clone()));
                    }
                }
            }
            debug!(event_type = %event.event_type, recipients, "presence broadcast");
        }
        for (user, connection_id) in to_remove {
            let _ = self.remove(&UserId::from_string(user), &connection_id).await;
        }
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
