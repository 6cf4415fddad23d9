//! Web Push payload and transport types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ripple_store::PushSubscriptionRow;

/// Structured payload handed to the push service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub body: String,
    /// Collapse tag — typically the triggering entity's ID.
    pub tag: String,
    /// Click-through data.
    pub data: PushData,
}

/// Click-through data carried alongside the notification.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushData {
    /// In-app URL to open.
    pub url: String,
    /// The triggering entity's ID.
    pub notification_id: String,
}

/// Outcome of one delivery attempt to one endpoint.
#[derive(Clone, Debug)]
pub struct PushSendResult {
    /// Whether the push service accepted the notification.
    pub success: bool,
    /// The endpoint attempted.
    pub endpoint: String,
    /// HTTP status, when a response was received.
    pub status_code: Option<u16>,
    /// The endpoint reported itself permanently invalid (404/410).
    pub gone: bool,
    /// Error description for failed attempts.
    pub error: Option<String>,
}

/// Transport seam for push delivery — implemented by the real
/// [`super::service::WebPushService`] and mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Attempt delivery to a single subscription.
    async fn deliver(&self, subscription: &PushSubscriptionRow, payload: &PushPayload)
    -> PushSendResult;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_camel_case() {
        let payload = PushPayload {
            title: "ada".into(),
            body: "hello".into(),
            tag: "m1".into(),
            data: PushData {
                url: "/messages/c1".into(),
                notification_id: "m1".into(),
            },
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["title"], "ada");
        assert_eq!(v["tag"], "m1");
        assert_eq!(v["data"]["url"], "/messages/c1");
        assert_eq!(v["data"]["notificationId"], "m1");
    }

    #[test]
    fn payload_roundtrip() {
        let raw = r#"{
            "title": "ripple",
            "body": "grace liked your post",
            "tag": "n1",
            "data": {"url": "/posts/p1", "notificationId": "n1"}
        }"#;
        let payload: PushPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.body, "grace liked your post");
        assert_eq!(payload.data.notification_id, "n1");
    }

    #[test]
    fn send_result_shapes() {
        let ok = PushSendResult {
            success: true,
            endpoint: "https://push.example/ep1".into(),
            status_code: Some(201),
            gone: false,
            error: None,
        };
        assert!(ok.success);

        let gone = PushSendResult {
            success: false,
            endpoint: "https://push.example/ep2".into(),
            status_code: Some(410),
            gone: true,
            error: Some("Gone".into()),
        };
        assert!(gone.gone);
        assert_eq!(gone.status_code, Some(410));
    }
}
