//! Web Push (VAPID) configuration loading from `~/.ripple/push/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// VAPID configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebPushConfig {
    /// Contact URI presented to push services (`mailto:` or `https:`).
    pub subject: String,
    /// Base64url-encoded VAPID public key (shared with clients).
    pub public_key: String,
    /// Optional explicit path to the EC private key PEM file.
    pub private_key_path: Option<String>,
}

impl WebPushConfig {
    /// Resolve the path to the private key file.
    pub fn resolved_key_path(&self) -> PathBuf {
        if let Some(ref path) = self.private_key_path {
            let expanded = if path.starts_with('~') {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/root".to_string());
                PathBuf::from(home).join(path.trim_start_matches("~/"))
            } else {
                PathBuf::from(path)
            };
            return expanded;
        }
        // Default: ~/.ripple/push/vapid_private.pem
        let home = std::env::var("HOME").unwrap_or_else(|_| "/root".to_string());
        PathBuf::from(home)
            .join(".ripple")
            .join("push")
            .join("vapid_private.pem")
    }
}

/// Load Web Push config from `~/.ripple/push/config.json`.
///
/// Returns `None` if config doesn't exist or is invalid (not an error —
/// push is optional and the server runs without it).
pub fn load_web_push_config() -> Option<WebPushConfig> {
    load_from_path(None)
}

/// Load Web Push config from a specific base directory (for testing).
pub(crate) fn load_from_path(base: Option<&Path>) -> Option<WebPushConfig> {
    let config_path = if let Some(base) = base {
        base.join("config.json")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/root".to_string());
        PathBuf::from(home)
            .join(".ripple")
            .join("push")
            .join("config.json")
    };

    if !config_path.exists() {
        debug!(?config_path, "web push config not found, push delivery disabled");
        return None;
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) => {
            warn!(?config_path, error = %e, "failed to read web push config");
            return None;
        }
    };

    let config: WebPushConfig = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!(?config_path, error = %e, "failed to parse web push config");
            return None;
        }
    };

    if config.public_key.is_empty() {
        warn!("web push config missing publicKey");
        return None;
    }
    if !config.subject.starts_with("mailto:") && !config.subject.starts_with("https://") {
        warn!(subject = %config.subject, "web push subject must be mailto: or https:");
        return None;
    }

    let key_path = config.resolved_key_path();
    if !key_path.exists() {
        warn!(?key_path, "VAPID private key file not found");
        return None;
    }

    debug!(subject = %config.subject, "web push config loaded");
    Some(config)
}
