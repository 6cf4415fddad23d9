//! Push subscription endpoints: public key, subscribe, unsubscribe.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use percent_encoding::percent_decode_str;
use serde::Deserialize;

use crate::auth::AuthedUser;
use crate::http::error::ApiError;
use crate::realtime::push::SubscriptionKeys;
use crate::server::AppState;

/// POST /api/push/subscribe request body (the browser subscription object).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeBody {
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Client key material.
    pub keys: SubscribeKeys,
}

/// Client key material inside a subscription.
#[derive(Debug, Deserialize)]
pub struct SubscribeKeys {
    /// Client public key.
    pub p256dh: String,
    /// Client auth secret.
    pub auth: String,
}

/// GET /api/push/public-key — unauthenticated; clients need it to subscribe.
pub async fn public_key(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    match state.delivery.push_channel().public_key() {
        Some(key) => Ok(Json(serde_json::json!({ "publicKey": key }))),
        None => Err(ApiError::NotFound("push delivery is not configured".into())),
    }
}

/// POST /api/push/subscribe
pub async fn subscribe(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(body): Json<SubscribeBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if body.endpoint.is_empty() {
        return Err(ApiError::BadRequest("endpoint is required".into()));
    }
    let upsert = state.delivery.push_channel().subscribe(
        user.user_id.as_str(),
        &SubscriptionKeys {
            endpoint: body.endpoint,
            p256dh: body.keys.p256dh,
            auth: body.keys.auth,
        },
    )?;
    let status = if upsert.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(serde_json::json!({ "id": upsert.id, "created": upsert.created })),
    ))
}

/// DELETE /api/push/subscriptions/{endpoint} — endpoint URL-encoded.
///
/// A second call for the same endpoint reports `removed: false` rather
/// than erroring.
pub async fn unsubscribe(
    State(state): State<AppState>,
    user: AuthedUser,
    Path(endpoint): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let endpoint = percent_decode_str(&endpoint)
        .decode_utf8()
        .map_err(|_| ApiError::BadRequest("endpoint is not valid UTF-8".into()))?;
    let removed = state
        .delivery
        .push_channel()
        .unsubscribe(user.user_id.as_str(), &endpoint)?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}
