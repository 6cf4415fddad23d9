//! Message endpoints: history and the request-path send.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use ripple_core::{MediaAttachment, UserId};

use crate::auth::AuthedUser;
use crate::http::error::ApiError;
use crate::http::pagination::{PageQuery, Paginated};
use crate::realtime::events::MessagePayload;
use crate::server::AppState;

/// POST /api/messages request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBody {
    /// Receiving user.
    pub receiver_id: String,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Attachments in send order.
    #[serde(default)]
    pub attachments: Vec<MediaAttachment>,
}

/// GET /api/conversations/{id}/messages
pub async fn history(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<MessagePayload>>, ApiError> {
    let (page, limit, offset) =
        query.clamp(state.config.default_page_size, state.config.max_page_size);
    let (rows, total) = state
        .store
        .messages_page(&id, user.user_id.as_str(), limit, offset)?;

    let items = rows
        .iter()
        .map(|row| MessagePayload::from_row(row, None))
        .collect();
    Ok(Json(Paginated::new(items, total, page, limit)))
}

/// POST /api/messages — the request/response send path.
///
/// Routes through the same delivery router as the WebSocket path: the
/// message persists, then live delivery or push fallback is attempted.
/// A send reports success once durably stored, whatever delivery did.
pub async fn send(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(body): Json<SendBody>,
) -> Result<(StatusCode, Json<MessagePayload>), ApiError> {
    let receiver = UserId::from_string(body.receiver_id);
    let routed = state
        .delivery
        .route_message(&user.user_id, &receiver, &body.content, &body.attachments)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessagePayload::from_row(&routed.message, None)),
    ))
}

/// POST /api/messages/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let routed = state
        .delivery
        .route_read_receipt(&user.user_id, crate::realtime::router::ReadTarget::Message(&id))
        .await?;
    Ok(Json(serde_json::json!({
        "conversationId": routed.conversation_id,
        "messagesRead": routed.updated_messages,
    })))
}
