//! Conversation endpoints: list, fetch, read-mark, pin, mute, delete.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use ripple_store::ConversationView;

use crate::auth::AuthedUser;
use crate::http::error::ApiError;
use crate::http::pagination::{PageQuery, Paginated};
use crate::realtime::router::ReadTarget;
use crate::server::AppState;

/// GET /api/conversations
pub async fn list(
    State(state): State<AppState>,
    user: AuthedUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<ConversationView>>, ApiError> {
    let (page, limit, offset) =
        query.clamp(state.config.default_page_size, state.config.max_page_size);
    let (rows, total) = state
        .store
        .list_conversations(user.user_id.as_str(), limit, offset)?;

    let views = rows
        .iter()
        .filter_map(|(conversation, member)| {
            ConversationView::project(conversation, member, user.user_id.as_str())
        })
        .collect();
    Ok(Json(Paginated::new(views, total, page, limit)))
}

/// GET /api/conversations/{id}
pub async fn get_one(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, ApiError> {
    let (conversation, member) = state.store.get_conversation(&id, user.user_id.as_str())?;
    ConversationView::project(&conversation, &member, user.user_id.as_str())
        .map(Json)
        .ok_or_else(|| ApiError::Forbidden("not a participant of this conversation".into()))
}

/// POST /api/conversations/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let routed = state
        .delivery
        .route_read_receipt(&user.user_id, ReadTarget::Conversation(&id))
        .await?;
    Ok(Json(serde_json::json!({
        "conversationId": routed.conversation_id,
        "messagesRead": routed.updated_messages,
    })))
}

/// POST /api/conversations/{id}/pin
pub async fn toggle_pin(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pinned = state.store.toggle_pinned(&id, user.user_id.as_str())?;
    Ok(Json(serde_json::json!({ "isPinned": pinned })))
}

/// POST /api/conversations/{id}/mute
pub async fn toggle_mute(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let muted = state.store.toggle_muted(&id, user.user_id.as_str())?;
    Ok(Json(serde_json::json!({ "isMuted": muted })))
}

/// DELETE /api/conversations/{id}
pub async fn delete_one(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_conversation(&id, user.user_id.as_str())?;
    Ok(StatusCode::NO_CONTENT)
}
