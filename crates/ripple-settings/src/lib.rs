//! # ripple-settings
//!
//! Configuration management with layered sources for the ripple backend.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`RippleSettings::default()`]
//! 2. **User file** — `~/.ripple/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `RIPPLE_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use ripple_settings::{get_settings, RippleSettings};
//!
//! let settings = get_settings();
//! println!("listening on {}:{}", settings.server.host, settings.server.port);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
///
/// Initialized on first access via [`get_settings`]. The settings are loaded
/// from `~/.ripple/settings.json` with env var overrides, or fall back to
/// compiled defaults if loading fails.
static SETTINGS: OnceLock<RippleSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.ripple/settings.json` with env var
/// overrides. On subsequent calls, returns the cached value. If loading
/// fails, returns compiled defaults.
pub fn get_settings() -> &'static RippleSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: RippleSettings) -> std::result::Result<(), RippleSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = RippleSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn deep_merge_re_exported() {
        let a = serde_json::json!({"x": 1});
        let b = serde_json::json!({"y": 2});
        let merged = deep_merge(a, b);
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = RippleSettings::default();
        assert_eq!(settings.version, "0.1.0");
        assert_eq!(settings.name, "ripple");
        assert_eq!(settings.server.port, 4080);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.heartbeat_interval_ms, 30_000);
        assert_eq!(settings.database.path, "ripple.db");
        assert_eq!(settings.messaging.max_content_chars, 4096);
        assert!(settings.auth.token_secret.is_none());
    }
}
