//! WebSocket client connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use ripple_core::UserId;

use crate::realtime::events::ServerEvent;

/// Represents a connected WebSocket client bound to a verified user.
pub struct ClientConnection {
    /// Unique connection ID (distinguishes devices of the same user).
    pub id: String,
    /// The authenticated user this connection belongs to.
    pub user_id: UserId,
    /// Send channel to the client's WebSocket write task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has responded to the last ping.
    pub is_alive: AtomicBool,
    /// When the last Pong (or any activity) was received.
    last_pong: Mutex<Instant>,
    /// Count of events dropped due to full channel.
    pub dropped_events: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection.
    pub fn new(id: String, user_id: UserId, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            user_id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_events: AtomicU64::new(0),
        }
    }

    /// Send a serialized event to the client.
    ///
    /// Returns `false` if the channel is full or closed, and increments
    /// the dropped event counter.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_events.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize a server event and send it to the client.
    pub fn send_event(&self, event: &ServerEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(json) => self.send(Arc::new(json)),
            Err(_) => false,
        }
    }

    /// Total events dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag for heartbeat.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
