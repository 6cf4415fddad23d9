//! Social-action notification fan-out.
//!
//! Post/follow logic records notifications through [`NotificationFanout`];
//! delivery reuses the presence registry (live path) and the push channel
//! (offline path). A recipient online right now gets the notification event
//! plus a refreshed unread count; an offline recipient gets a web push with
//! a click-through URL derived from the notification kind.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use ripple_core::{NotificationKind, UserId};
use ripple_store::{ChatStore, NewNotification, NotificationRow, StoreError};

use crate::metrics::NOTIFICATIONS_DELIVERED_TOTAL;
use crate::platform::webpush::{PushPayload, types::PushData};
use crate::realtime::events::{self, ServerEvent};
use crate::realtime::push::PushChannel;
use crate::websocket::presence::PresenceRegistry;

/// Fan-out pipeline for social-action notifications.
pub struct NotificationFanout {
    store: Arc<ChatStore>,
    presence: Arc<PresenceRegistry>,
    push: Arc<PushChannel>,
}

impl NotificationFanout {
    /// Create a fan-out over the shared presence registry and push channel.
    pub fn new(store: Arc<ChatStore>, presence: Arc<PresenceRegistry>, push: Arc<PushChannel>) -> Self {
        Self {
            store,
            presence,
            push,
        }
    }

    /// Record a notification and deliver it.
    ///
    /// Self-actions are suppressed by the store and deliver nothing.
    /// Persistence failures propagate; delivery failures never do.
    pub async fn record_and_deliver(
        &self,
        notification: &NewNotification<'_>,
    ) -> Result<Option<NotificationRow>, StoreError> {
        let Some(row) = self.store.create_notification(notification)? else {
            return Ok(None);
        };
        self.deliver(&row).await;
        Ok(Some(row))
    }

    /// Deliver an already-persisted notification: live when the recipient
    /// is online, web push otherwise.
    pub async fn deliver(&self, notification: &NotificationRow) {
        let recipient = UserId::from(notification.recipient_id.as_str());

        if self.presence.is_online(&recipient).await {
            let event = ServerEvent::new(
                events::NOTIFICATION,
                serde_json::json!({
                    "id": notification.id,
                    "senderId": notification.sender_id,
                    "kind": notification.kind,
                    "postId": notification.post_id,
                    "body": notification.body,
                    "isRead": notification.is_read,
                    "createdAt": notification.created_at,
                }),
            );
            let _ = self.presence.send_to(&recipient, &event).await;

            match self.store.unread_notification_count(&notification.recipient_id) {
                Ok(count) => {
                    let unread = ServerEvent::new(
                        events::UNREAD_COUNT,
                        serde_json::json!({ "notifications": count }),
                    );
                    let _ = self.presence.send_to(&recipient, &unread).await;
                }
                Err(e) => {
                    warn!(recipient = %recipient, error = %e, "failed to refresh unread count");
                }
            }

            counter!(NOTIFICATIONS_DELIVERED_TOTAL, "path" => "live").increment(1);
            debug!(notification_id = %notification.id, recipient = %recipient, "notification delivered live");
        } else {
            let payload = PushPayload {
                title: "ripple".into(),
                body: notification.body.clone(),
                tag: notification.id.clone(),
                data: PushData {
                    url: click_url(notification),
                    notification_id: notification.id.clone(),
                },
            };
            let outcome = self.push.send(&notification.recipient_id, &payload).await;
            let path = if outcome.attempted > 0 { "push" } else { "none" };
            counter!(NOTIFICATIONS_DELIVERED_TOTAL, "path" => path).increment(1);
            debug!(
                notification_id = %notification.id,
                recipient = %recipient,
                attempted = outcome.attempted,
                "notification handed to push channel"
            );
        }
    }
}

/// The in-app URL a notification click should open.
///
/// Post-scoped kinds link to the post permalink; follows link to the
/// sender's profile.
fn click_url(notification: &NotificationRow) -> String {
    match NotificationKind::parse(&notification.kind) {
        Some(NotificationKind::Like | NotificationKind::Reply | NotificationKind::Mention) => {
            notification
                .post_id
                .as_ref()
                .map_or_else(|| "/notifications".to_owned(), |post| format!("/posts/{post}"))
        }
        Some(NotificationKind::Follow) => format!("/users/{}", notification.sender_id),
        None => "/notifications".to_owned(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::webpush::PushSendResult;
    use crate::platform::webpush::types::MockPushTransport;
    use crate::realtime::push::SubscriptionKeys;
    use crate::websocket::connection::ClientConnection;
    use ripple_store::{ConnectionConfig, new_in_memory, run_migrations};
    use tokio::sync::mpsc;

    fn make_store() -> Arc<ChatStore> {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        let store = ChatStore::new(pool);
        for (id, name) in [("u1", "ada"), ("u2", "grace")] {
            store
                .upsert_user(&UserId::from(id), name, None, None)
                .unwrap();
        }
        Arc::new(store)
    }

    fn make_fanout(
        store: Arc<ChatStore>,
        transport: Option<Arc<dyn crate::platform::webpush::PushTransport>>,
    ) -> (NotificationFanout, Arc<PresenceRegistry>) {
        let presence = Arc::new(PresenceRegistry::new());
        let push = Arc::new(PushChannel::new(store.clone(), transport, None));
        (
            NotificationFanout::new(store, presence.clone(), push),
            presence,
        )
    }

    fn connect(
        user: &str,
    ) -> (Arc<ClientConnection>, mpsc::Receiver<std::sync::Arc<String>>) {
        let (tx, rx) = mpsc::channel(32);
        (
            Arc::new(ClientConnection::new(
                format!("conn_{user}"),
                UserId::from(user),
                tx,
            )),
            rx,
        )
    }

    fn like_notification<'a>() -> NewNotification<'a> {
        NewNotification {
            recipient: "u1",
            sender: "u2",
            kind: NotificationKind::Like,
            post_id: Some("p1"),
            body: "grace liked your post",
        }
    }

    #[tokio::test]
    async fn online_recipient_gets_live_event_and_unread_count() {
        let store = make_store();
        let mut transport = MockPushTransport::new();
        transport.expect_deliver().times(0);
        let (fanout, presence) = make_fanout(store, Some(Arc::new(transport)));

        let (conn, mut rx) = connect("u1");
        let _ = presence.register(conn).await;

        let row = fanout
            .record_and_deliver(&like_notification())
            .await
            .unwrap()
            .unwrap();

        let first: serde_json::Value =
            serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(first["type"], "notification");
        assert_eq!(first["data"]["id"], row.id.as_str());
        assert_eq!(first["data"]["kind"], "like");

        let second: serde_json::Value =
            serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(second["type"], "unread_count");
        assert_eq!(second["data"]["notifications"], 1);
    }

    #[tokio::test]
    async fn offline_recipient_goes_through_push_channel() {
        let store = make_store();
        let mut transport = MockPushTransport::new();
        transport
            .expect_deliver()
            .times(1)
            .withf(|_sub, payload| {
                payload.body == "grace liked your post" && payload.data.url == "/posts/p1"
            })
            .returning(|sub, _| PushSendResult {
                success: true,
                endpoint: sub.endpoint.clone(),
                status_code: Some(201),
                gone: false,
                error: None,
            });
        let (fanout, _presence) = make_fanout(store.clone(), Some(Arc::new(transport)));

        let push = PushChannel::new(store, None, None);
        let _ = push
            .subscribe(
                "u1",
                &SubscriptionKeys {
                    endpoint: "https://push.example/ep1".into(),
                    p256dh: "pk".into(),
                    auth: "auth".into(),
                },
            )
            .unwrap();

        let row = fanout
            .record_and_deliver(&like_notification())
            .await
            .unwrap();
        assert!(row.is_some());
    }

    #[tokio::test]
    async fn offline_recipient_without_subscriptions_delivers_nothing() {
        let store = make_store();
        let mut transport = MockPushTransport::new();
        transport.expect_deliver().times(0);
        let (fanout, _presence) = make_fanout(store, Some(Arc::new(transport)));

        let row = fanout
            .record_and_deliver(&like_notification())
            .await
            .unwrap();
        assert!(row.is_some(), "notification persists even with no delivery path");
    }

    #[tokio::test]
    async fn self_notification_suppressed() {
        let store = make_store();
        let (fanout, _presence) = make_fanout(store, None);

        let result = fanout
            .record_and_deliver(&NewNotification {
                recipient: "u1",
                sender: "u1",
                kind: NotificationKind::Like,
                post_id: Some("p1"),
                body: "you liked your own post",
            })
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn click_url_by_kind() {
        let mut row = NotificationRow {
            id: "n1".into(),
            recipient_id: "u1".into(),
            sender_id: "u2".into(),
            kind: "like".into(),
            post_id: Some("p1".into()),
            body: "liked".into(),
            is_read: false,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        assert_eq!(click_url(&row), "/posts/p1");

        row.kind = "reply".into();
        assert_eq!(click_url(&row), "/posts/p1");

        row.kind = "mention".into();
        assert_eq!(click_url(&row), "/posts/p1");

        row.kind = "follow".into();
        assert_eq!(click_url(&row), "/users/u2");
    }

    #[test]
    fn click_url_degrades_without_post() {
        let row = NotificationRow {
            id: "n1".into(),
            recipient_id: "u1".into(),
            sender_id: "u2".into(),
            kind: "like".into(),
            post_id: None,
            body: "liked".into(),
            is_read: false,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        assert_eq!(click_url(&row), "/notifications");
    }
}
