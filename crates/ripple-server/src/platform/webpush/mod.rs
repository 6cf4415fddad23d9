//! Web Push delivery — VAPID signing, HTTP transport, config loading.

pub mod config;
pub mod service;
pub mod types;

pub use config::{WebPushConfig, load_web_push_config};
pub use service::{WebPushError, WebPushService};
pub use types::{PushData, PushPayload, PushSendResult, PushTransport};
