//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the JSON wire
//! format used by the deployment tooling. Each type implements [`Default`]
//! with production default values, and `#[serde(default)]` allows partial
//! JSON — missing fields get their default value during deserialization.

use serde::{Deserialize, Serialize};

/// Root settings type for the ripple backend.
///
/// Loaded from `~/.ripple/settings.json` with defaults applied for missing
/// fields. Environment variables can override specific values.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RippleSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Server network settings.
    pub server: ServerSettings,
    /// Database settings.
    pub database: DatabaseSettings,
    /// Bearer-token verification settings.
    pub auth: AuthSettings,
    /// Messaging limits.
    pub messaging: MessagingSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for RippleSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "ripple".to_string(),
            server: ServerSettings::default(),
            database: DatabaseSettings::default(),
            auth: AuthSettings::default(),
            messaging: MessagingSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Server network and runtime settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// HTTP + WebSocket port.
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// WebSocket heartbeat interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Disconnect after this long without a pong, in milliseconds.
    pub heartbeat_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4080,
            max_connections: 1024,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 60_000,
        }
    }
}

/// Database settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Path to the `SQLite` database file (relative to `~/.ripple`).
    pub path: String,
    /// Maximum pool size.
    pub pool_size: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "ripple.db".to_string(),
            pool_size: 16,
        }
    }
}

/// Bearer-token verification settings.
///
/// Token issuance belongs to the account service; this backend only
/// verifies. With no secret configured the server refuses to start.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// HMAC secret shared with the token issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_secret: Option<String>,
}

/// Messaging limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessagingSettings {
    /// Maximum message text length in characters.
    pub max_content_chars: usize,
    /// Maximum attachments per message.
    pub max_attachments: usize,
    /// Default page size for history queries.
    pub default_page_size: i64,
    /// Maximum page size for history queries.
    pub max_page_size: i64,
}

impl Default for MessagingSettings {
    fn default() -> Self {
        Self {
            max_content_chars: 4096,
            max_attachments: 10,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Log level filter (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: LogLevel,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
        }
    }
}

/// Log level for the tracing subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational (default).
    #[default]
    Info,
    /// Debug detail.
    Debug,
    /// Full trace detail.
    Trace,
}

impl LogLevel {
    /// The `tracing_subscriber` filter directive for this level.
    pub fn as_filter_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
