//! Delivery routing: live push vs. web-push fallback, read receipts,
//! typing indicators, and notification fan-out.

pub mod events;
pub mod fanout;
pub mod push;
pub mod router;
pub mod typing;
