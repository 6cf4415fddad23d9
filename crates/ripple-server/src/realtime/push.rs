//! Push channel — subscription lifecycle plus fan-out delivery with stale
//! endpoint pruning.
//!
//! Failure policy: a delivery attempt whose endpoint reports itself gone
//! (404/410) prunes that subscription row; any other failure is logged and
//! swallowed. A failed push never fails the caller's enclosing operation —
//! the triggering message or notification is already durable.

use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;
use tracing::{debug, warn};

use ripple_store::{ChatStore, StoreError, SubscriptionUpsert};

use crate::metrics::{PUSH_FAILURES_TOTAL, PUSH_SENDS_TOTAL, PUSH_SUBSCRIPTIONS_PRUNED_TOTAL};
use crate::platform::webpush::{PushPayload, PushTransport};

/// Client-provided subscription keys.
#[derive(Debug, Clone)]
pub struct SubscriptionKeys {
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Client public key (p256dh).
    pub p256dh: String,
    /// Client auth secret.
    pub auth: String,
}

/// Outcome of a fan-out, for logging and tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PushOutcome {
    /// Subscriptions attempted.
    pub attempted: usize,
    /// Attempts the push service accepted.
    pub delivered: usize,
    /// Stale subscription rows pruned.
    pub pruned: usize,
}

/// Offline-delivery channel backed by per-user push subscriptions.
pub struct PushChannel {
    store: Arc<ChatStore>,
    transport: Option<Arc<dyn PushTransport>>,
    public_key: Option<String>,
}

impl PushChannel {
    /// Create a channel. With no transport configured, `send` is a no-op
    /// and subscription management still works.
    pub fn new(
        store: Arc<ChatStore>,
        transport: Option<Arc<dyn PushTransport>>,
        public_key: Option<String>,
    ) -> Self {
        Self {
            store,
            transport,
            public_key,
        }
    }

    /// Whether a transport is configured.
    pub fn enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// The public VAPID key clients subscribe with, when push is enabled.
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    /// Upsert a subscription keyed by `(user, endpoint)`.
    pub fn subscribe(&self, user: &str, keys: &SubscriptionKeys) -> Result<SubscriptionUpsert, StoreError> {
        self.store
            .subscribe_push(user, &keys.endpoint, &keys.p256dh, &keys.auth)
    }

    /// Delete a subscription. Returns whether a row was removed.
    pub fn unsubscribe(&self, user: &str, endpoint: &str) -> Result<bool, StoreError> {
        self.store.unsubscribe_push(user, endpoint)
    }

    /// Fan a payload out to every subscription the user has, each attempt
    /// independent and in parallel. Never returns an error: delivery
    /// failures are logged, gone endpoints are pruned.
    pub async fn send(&self, user: &str, payload: &PushPayload) -> PushOutcome {
        let Some(ref transport) = self.transport else {
            debug!(user, "push disabled, skipping delivery");
            return PushOutcome::default();
        };

        let subscriptions = match self.store.push_subscriptions(user) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(user, error = %e, "failed to load push subscriptions");
                return PushOutcome::default();
            }
        };
        if subscriptions.is_empty() {
            return PushOutcome::default();
        }

        let attempts = subscriptions
            .iter()
            .map(|sub| transport.deliver(sub, payload));
        let results = join_all(attempts).await;

        let mut outcome = PushOutcome {
            attempted: results.len(),
            ..PushOutcome::default()
        };
        counter!(PUSH_SENDS_TOTAL).increment(outcome.attempted as u64);

        for result in results {
            if result.success {
                outcome.delivered += 1;
            } else if result.gone {
                counter!(PUSH_FAILURES_TOTAL, "reason" => "gone").increment(1);
                match self.store.unsubscribe_push(user, &result.endpoint) {
                    Ok(true) => {
                        counter!(PUSH_SUBSCRIPTIONS_PRUNED_TOTAL).increment(1);
                        outcome.pruned += 1;
                        debug!(user, endpoint = %result.endpoint, "pruned stale push subscription");
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(user, endpoint = %result.endpoint, error = %e, "failed to prune subscription");
                    }
                }
            } else {
                counter!(PUSH_FAILURES_TOTAL, "reason" => "error").increment(1);
                warn!(
                    user,
                    endpoint = %result.endpoint,
                    status = ?result.status_code,
                    error = ?result.error,
                    "push delivery failed"
                );
            }
        }

        debug!(
            user,
            attempted = outcome.attempted,
            delivered = outcome.delivered,
            pruned = outcome.pruned,
            "push fan-out complete"
        );
        outcome
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
