//! Server configuration.

use serde::{Deserialize, Serialize};

use ripple_settings::RippleSettings;

/// Configuration for the ripple server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Heartbeat interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Disconnect after this long without a pong, in milliseconds.
    pub heartbeat_timeout_ms: u64,
    /// Maximum message text length in characters.
    pub max_content_chars: usize,
    /// Maximum attachments per message.
    pub max_attachments: usize,
    /// Default page size for history queries.
    pub default_page_size: i64,
    /// Maximum page size for history queries.
    pub max_page_size: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 1024,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 60_000,
            max_content_chars: 4096,
            max_attachments: 10,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl From<&RippleSettings> for ServerConfig {
    fn from(settings: &RippleSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            max_connections: settings.server.max_connections,
            heartbeat_interval_ms: settings.server.heartbeat_interval_ms,
            heartbeat_timeout_ms: settings.server.heartbeat_timeout_ms,
            max_content_chars: settings.messaging.max_content_chars,
            max_attachments: settings.messaging.max_attachments,
            default_page_size: settings.messaging.default_page_size,
            max_page_size: settings.messaging.max_page_size,
        }
    }
}
