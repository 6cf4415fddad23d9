//! Connection-time and request-time bearer-token verification.
//!
//! Token issuance belongs to the account service. This module only decodes
//! and verifies: a token that does not resolve to a user identity rejects
//! the connection or request before any state is touched.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ripple_core::{Profile, UserId};

/// Verification failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential was supplied.
    #[error("missing credential")]
    Missing,
    /// The credential did not verify.
    #[error("invalid credential: {0}")]
    Invalid(String),
}

/// The verified identity attached to a connection or request.
#[derive(Clone, Debug)]
pub struct AuthedUser {
    /// Stable user identifier.
    pub user_id: UserId,
    /// Unique handle.
    pub username: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Avatar reference.
    pub avatar: Option<String>,
}

impl AuthedUser {
    /// The display profile carried by the token.
    pub fn profile(&self) -> Profile {
        Profile {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Resolves a verified user identity from a bearer credential.
pub trait TokenVerifier: Send + Sync {
    /// Verify a token, returning the identity it carries.
    fn verify(&self, token: &str) -> Result<AuthedUser, AuthError>;
}

/// JWT claims issued by the account service.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    /// User ID.
    pub sub: String,
    /// Unique handle.
    pub username: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Expiry (Unix timestamp).
    pub exp: i64,
}

/// HS256 JWT verifier sharing a secret with the token issuer.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Create a verifier from the shared HMAC secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<AuthedUser, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Missing);
        }
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::Invalid(e.to_string()))?;
        if data.claims.sub.is_empty() {
            return Err(AuthError::Invalid("empty subject".into()));
        }
        Ok(AuthedUser {
            user_id: UserId::from_string(data.claims.sub),
            username: data.claims.username,
            display_name: data.claims.display_name,
            avatar: data.claims.avatar,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
