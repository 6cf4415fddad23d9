//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::AuthedUser;
use crate::http::error::ApiError;
use crate::server::AppState;

/// Extracts the verified identity from the `Authorization: Bearer` header.
///
/// Rejects with 401 before the handler body runs; no partial state is
/// created for unauthenticated requests.
impl FromRequestParts<AppState> for AuthedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing credential".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".into()))?;

        Ok(state.verifier.verify(token)?)
    }
}
