//! HTTP error mapping.
//!
//! Propagation policy: persistence failures surface as hard errors;
//! validation, authorization, and lookup failures map to their status
//! codes; delivery-path failures never reach this layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use ripple_store::StoreError;

use crate::auth::AuthError;
use crate::realtime::router::RouteError;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request failed validation.
    #[error("{0}")]
    BadRequest(String),
    /// Missing or unverifiable credential.
    #[error("{0}")]
    Unauthorized(String),
    /// Acting on a resource the user has no rights to.
    #[error("{0}")]
    Forbidden(String),
    /// Resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Unexpected failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // 5xx details stay in the log, not the response body.
        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(detail, "internal error");
                "internal error".to_owned()
            }
            other => other.to_string(),
        };
        let body = Json(serde_json::json!({
            "error": { "code": self.code(), "message": message }
        }));
        (self.status(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConversationNotFound(id) => Self::NotFound(format!("conversation {id}")),
            StoreError::MessageNotFound(id) => Self::NotFound(format!("message {id}")),
            StoreError::NotificationNotFound(id) => Self::NotFound(format!("notification {id}")),
            StoreError::UserNotFound(id) => Self::NotFound(format!("user {id}")),
            StoreError::NotAParticipant { .. } => {
                Self::Forbidden("not a participant of this conversation".into())
            }
            StoreError::InvalidOperation(msg) => Self::BadRequest(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<RouteError> for ApiError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::Store(store) => store.into(),
            RouteError::UnknownReceiver(id) => Self::NotFound(format!("user {id}")),
            validation => Self::BadRequest(validation.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_not_found_maps_to_404() {
        let err: ApiError = StoreError::ConversationNotFound("c1".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_not_a_participant_maps_to_403() {
        let err: ApiError = StoreError::NotAParticipant {
            user: "u1".into(),
            conversation: "c1".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn store_internal_maps_to_500() {
        let err: ApiError = StoreError::Internal("lock poisoned".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn route_validation_maps_to_400() {
        let err: ApiError = RouteError::EmptyMessage.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = RouteError::SelfMessage.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn route_unknown_receiver_maps_to_404() {
        let err: ApiError = RouteError::UnknownReceiver("ghost".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn auth_error_maps_to_401() {
        let err: ApiError = AuthError::Missing.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn internal_detail_not_leaked() {
        let response = ApiError::Internal("secret table missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
