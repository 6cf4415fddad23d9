//! Web Push service — VAPID JWT signing, HTTP delivery.
//!
//! Uses `reqwest` for transport and `jsonwebtoken` for ES256 VAPID
//! signing. Tokens are cached per push-service origin and refreshed before
//! expiry. Delivery carries a 24-hour TTL understood by the push service.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ripple_store::PushSubscriptionRow;

use super::config::WebPushConfig;
use super::types::{PushPayload, PushSendResult, PushTransport};

/// How long a notification may be queued by the push service (24 hours).
const PUSH_TTL_SECS: u64 = 86_400;

/// VAPID token lifetime presented to push services (12 hours).
const VAPID_TOKEN_LIFETIME_SECS: i64 = 12 * 60 * 60;

/// Refresh cached tokens after this long (leaves an hour of slack).
const TOKEN_VALIDITY: Duration = Duration::from_secs(11 * 60 * 60);

/// VAPID JWT claims.
#[derive(Debug, Serialize, Deserialize)]
struct VapidClaims {
    /// Push-service origin the token is scoped to.
    aud: String,
    /// Expiry (Unix timestamp).
    exp: i64,
    /// Operator contact URI.
    sub: String,
}

/// Cached VAPID token with expiry tracking.
struct CachedToken {
    token: String,
    created_at: Instant,
}

/// Web Push service for delivering notifications to subscription endpoints.
pub struct WebPushService {
    config: WebPushConfig,
    encoding_key: EncodingKey,
    client: reqwest::Client,
    cached_tokens: Mutex<HashMap<String, CachedToken>>,
}

impl std::fmt::Debug for WebPushService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebPushService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WebPushService {
    /// Create a new service from config.
    ///
    /// Reads the private key from disk and builds an HTTP client.
    pub fn new(config: WebPushConfig) -> Result<Self, WebPushError> {
        let key_path = config.resolved_key_path();
        let key_pem = std::fs::read(&key_path).map_err(|e| WebPushError::KeyRead {
            path: key_path.display().to_string(),
            reason: e.to_string(),
        })?;

        let encoding_key =
            EncodingKey::from_ec_pem(&key_pem).map_err(|e| WebPushError::KeyParse {
                reason: e.to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WebPushError::ClientBuild {
                reason: e.to_string(),
            })?;

        info!(subject = %config.subject, "web push service initialized");

        Ok(Self {
            config,
            encoding_key,
            client,
            cached_tokens: Mutex::new(HashMap::new()),
        })
    }

    /// The public VAPID key clients subscribe with.
    pub fn public_key(&self) -> &str {
        &self.config.public_key
    }

    /// Get a cached VAPID token for an origin or sign a new one.
    fn get_or_refresh_token(&self, origin: &str) -> Result<String, WebPushError> {
        let mut cached = self
            .cached_tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(token) = cached.get(origin) {
            if token.created_at.elapsed() < TOKEN_VALIDITY {
                return Ok(token.token.clone());
            }
        }

        let jwt = self.sign_vapid_token(origin)?;
        let _ = cached.insert(
            origin.to_owned(),
            CachedToken {
                token: jwt.clone(),
                created_at: Instant::now(),
            },
        );
        Ok(jwt)
    }

    /// Sign a new ES256 VAPID token scoped to a push-service origin.
    fn sign_vapid_token(&self, origin: &str) -> Result<String, WebPushError> {
        let header = Header::new(Algorithm::ES256);
        let claims = VapidClaims {
            aud: origin.to_owned(),
            exp: chrono::Utc::now().timestamp() + VAPID_TOKEN_LIFETIME_SECS,
            sub: self.config.subject.clone(),
        };
        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            WebPushError::JwtSign {
                reason: e.to_string(),
            }
        })
    }
}

#[async_trait]
impl PushTransport for WebPushService {
    async fn deliver(
        &self,
        subscription: &PushSubscriptionRow,
        payload: &PushPayload,
    ) -> PushSendResult {
        let origin = match endpoint_origin(&subscription.endpoint) {
            Some(o) => o,
            None => {
                return PushSendResult {
                    success: false,
                    endpoint: subscription.endpoint.clone(),
                    status_code: None,
                    gone: false,
                    error: Some("endpoint is not a valid URL".into()),
                };
            }
        };

        let jwt = match self.get_or_refresh_token(&origin) {
            Ok(t) => t,
            Err(e) => {
                return PushSendResult {
                    success: false,
                    endpoint: subscription.endpoint.clone(),
                    status_code: None,
                    gone: false,
                    error: Some(format!("VAPID signing failed: {e}")),
                };
            }
        };

        let result = self
            .client
            .post(&subscription.endpoint)
            .header(
                "authorization",
                format!("vapid t={jwt}, k={}", self.config.public_key),
            )
            .header("ttl", PUSH_TTL_SECS.to_string())
            .header("urgency", "normal")
            .json(payload)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                if response.status().is_success() {
                    PushSendResult {
                        success: true,
                        endpoint: subscription.endpoint.clone(),
                        status_code: Some(status),
                        gone: false,
                        error: None,
                    }
                } else {
                    let gone = status == 404 || status == 410;
                    let body = response.text().await.unwrap_or_default();
                    warn!(
                        status,
                        gone,
                        endpoint = %subscription.endpoint,
                        "push delivery rejected"
                    );
                    PushSendResult {
                        success: false,
                        endpoint: subscription.endpoint.clone(),
                        status_code: Some(status),
                        gone,
                        error: Some(body),
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, endpoint = %subscription.endpoint, "push delivery transport error");
                PushSendResult {
                    success: false,
                    endpoint: subscription.endpoint.clone(),
                    status_code: None,
                    gone: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Extract `scheme://host[:port]` from an endpoint URL without a URL crate.
fn endpoint_origin(endpoint: &str) -> Option<String> {
    let scheme_end = endpoint.find("://")?;
    let scheme = &endpoint[..scheme_end];
    if scheme != "https" && scheme != "http" {
        return None;
    }
    let rest = &endpoint[scheme_end + 3..];
    let host_end = rest.find('/').unwrap_or(rest.len());
    let host = &rest[..host_end];
    if host.is_empty() {
        return None;
    }
    Some(format!("{scheme}://{host}"))
}

/// Web Push service errors.
#[derive(Debug, thiserror::Error)]
pub enum WebPushError {
    /// Failed to read the private key file.
    #[error("failed to read VAPID key at {path}: {reason}")]
    KeyRead {
        /// Key file path.
        path: String,
        /// Error description.
        reason: String,
    },
    /// Failed to parse the private key.
    #[error("failed to parse VAPID key: {reason}")]
    KeyParse {
        /// Error description.
        reason: String,
    },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {reason}")]
    ClientBuild {
        /// Error description.
        reason: String,
    },
    /// Failed to sign a VAPID token.
    #[error("failed to sign VAPID token: {reason}")]
    JwtSign {
        /// Error description.
        reason: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
