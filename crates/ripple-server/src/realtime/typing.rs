//! Transient typing-indicator state.
//!
//! Nothing here is persisted or buffered: an indicator is forwarded only if
//! the receiver is online right now and is silently dropped otherwise. The
//! map exists solely so a disconnecting client's active indicators can be
//! cleared for whoever was watching them.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

/// Tracks which (sender → receiver) typing indicators are currently active.
pub struct TypingTracker {
    /// sender → receivers currently seeing that sender's indicator.
    active: Mutex<HashMap<String, HashSet<String>>>,
}

impl TypingTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Record a typing state change. Returns whether the state changed
    /// (repeated `true` or `false` for the same pair is a no-op).
    pub fn set(&self, sender: &str, receiver: &str, is_typing: bool) -> bool {
        let mut active = self.active.lock();
        if is_typing {
            active
                .entry(sender.to_owned())
                .or_default()
                .insert(receiver.to_owned())
        } else {
            let Some(receivers) = active.get_mut(sender) else {
                return false;
            };
            let removed = receivers.remove(receiver);
            if receivers.is_empty() {
                let _ = active.remove(sender);
            }
            removed
        }
    }

    /// Drop every indicator a sender had active, returning the receivers
    /// that were watching (so a stopped-typing event can be forwarded).
    pub fn clear_sender(&self, sender: &str) -> Vec<String> {
        let mut active = self.active.lock();
        active
            .remove(sender)
            .map(|receivers| receivers.into_iter().collect())
            .unwrap_or_default()
    }

    /// Whether a sender currently shows as typing to a receiver.
    pub fn is_typing(&self, sender: &str, receiver: &str) -> bool {
        self.active
            .lock()
            .get(sender)
            .is_some_and(|receivers| receivers.contains(receiver))
    }
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
