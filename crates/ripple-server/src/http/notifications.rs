//! Notification endpoints: list, unread count, mark read.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Serialize;

use ripple_store::NotificationRow;

use crate::auth::AuthedUser;
use crate::http::error::ApiError;
use crate::http::pagination::{PageQuery, Paginated};
use crate::server::AppState;

/// A notification as serialized onto the wire.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// Notification ID.
    pub id: String,
    /// User whose action produced the notification.
    pub sender_id: String,
    /// Action kind.
    pub kind: String,
    /// Referenced post, when the kind concerns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    /// Human-readable text.
    pub body: String,
    /// Whether the recipient has read it.
    pub is_read: bool,
    /// Creation timestamp.
    pub created_at: String,
}

impl From<&NotificationRow> for NotificationPayload {
    fn from(row: &NotificationRow) -> Self {
        Self {
            id: row.id.clone(),
            sender_id: row.sender_id.clone(),
            kind: row.kind.clone(),
            post_id: row.post_id.clone(),
            body: row.body.clone(),
            is_read: row.is_read,
            created_at: row.created_at.clone(),
        }
    }
}

/// GET /api/notifications
pub async fn list(
    State(state): State<AppState>,
    user: AuthedUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<NotificationPayload>>, ApiError> {
    let (page, limit, offset) =
        query.clamp(state.config.default_page_size, state.config.max_page_size);
    let (rows, total) = state
        .store
        .notifications_page(user.user_id.as_str(), limit, offset)?;

    let items = rows.iter().map(NotificationPayload::from).collect();
    Ok(Json(Paginated::new(items, total, page, limit)))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let count = state
        .store
        .unread_notification_count(user.user_id.as_str())?;
    Ok(Json(serde_json::json!({ "notifications": count })))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let changed = state
        .store
        .mark_notification_read(&id, user.user_id.as_str())?;
    Ok(Json(serde_json::json!({ "updated": changed })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_from_row() {
        let row = NotificationRow {
            id: "n1".into(),
            recipient_id: "u1".into(),
            sender_id: "u2".into(),
            kind: "mention".into(),
            post_id: Some("p1".into()),
            body: "grace mentioned you".into(),
            is_read: false,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        let payload = NotificationPayload::from(&row);
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["senderId"], "u2");
        assert_eq!(v["kind"], "mention");
        assert_eq!(v["postId"], "p1");
        // The recipient is implicit (it's the authed user), never echoed
        assert!(v.get("recipientId").is_none());
    }

    #[test]
    fn payload_without_post_omits_field() {
        let row = NotificationRow {
            id: "n1".into(),
            recipient_id: "u1".into(),
            sender_id: "u2".into(),
            kind: "follow".into(),
            post_id: None,
            body: "grace followed you".into(),
            is_read: false,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_string(&NotificationPayload::from(&row)).unwrap();
        assert!(!json.contains("postId"));
    }
}
