//! Stateless repositories — every method takes `&Connection`.
//!
//! Transaction scope is owned by the caller (the [`crate::store::chat_store::ChatStore`]
//! facade); repositories never begin or commit transactions themselves.

pub mod conversation;
pub mod message;
pub mod notification;
pub mod push_subscription;
pub mod user;
