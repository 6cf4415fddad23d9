//! # ripple-core
//!
//! Shared vocabulary for the ripple real-time backend.
//!
//! - **Branded IDs**: `UserId`, `ConversationId`, `MessageId`,
//!   `NotificationId`, `SubscriptionId` as newtypes for type safety
//! - **Profiles**: the `Profile` shape resolved for display enrichment
//! - **Media**: `MediaAttachment` / `MediaKind` carried by direct messages
//! - **Notifications**: `NotificationKind` for social-action fan-out

#![deny(unsafe_code)]

pub mod ids;
pub mod media;
pub mod notification;
pub mod profile;

pub use ids::{ConversationId, MessageId, NotificationId, SubscriptionId, UserId};
pub use media::{MediaAttachment, MediaKind};
pub use notification::NotificationKind;
pub use profile::Profile;

/// Current UTC timestamp as RFC 3339 with millisecond precision.
///
/// All persisted and wire-format timestamps in ripple use this shape.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
