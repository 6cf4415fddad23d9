//! # ripple-store
//!
//! `SQLite` persistence for the ripple real-time core.
//!
//! - **Conversations**: one row per unordered participant pair, with a
//!   denormalized last-message snapshot and per-participant view state
//!   (unread count, pinned, muted) in a separate member table
//! - **Messages**: append-only log, immutable except for the read flag
//! - **Notifications**: social-action records delivered through the fan-out
//! - **Push subscriptions**: one row per `(user, endpoint)` pair
//! - **[`ChatStore`]**: transactional facade with per-conversation write
//!   serialization and storage-side atomic counter updates

#![deny(unsafe_code)]

pub mod errors;
pub mod sqlite;
pub mod store;
pub mod view;

pub use errors::{Result, StoreError};
pub use sqlite::connection::{ConnectionConfig, ConnectionPool, new_file, new_in_memory};
pub use sqlite::migrations::run_migrations;
pub use sqlite::row_types::{
    ConversationRow, MemberRow, MessageRow, NotificationRow, PushSubscriptionRow, UserRow,
};
pub use sqlite::repositories::push_subscription::SubscriptionUpsert;
pub use store::chat_store::{ChatStore, NewMessage, NewNotification, ReadOutcome, SendOutcome};
pub use view::ConversationView;
