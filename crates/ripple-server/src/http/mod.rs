//! HTTP surface: conversation, message, notification, and push-subscription
//! endpoints.
//!
//! Every handler is a thin shim over [`crate::realtime::router::DeliveryRouter`]
//! and [`ripple_store::ChatStore`]; the WebSocket path reuses the same
//! router, so a request-path send and a socket-path send can never diverge.

pub mod conversations;
pub mod error;
pub mod extract;
pub mod messages;
pub mod notifications;
pub mod pagination;
pub mod push;
