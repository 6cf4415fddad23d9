//! # ripple-server
//!
//! Axum HTTP + `WebSocket` server for the ripple real-time core.
//!
//! - **Presence**: in-memory session registry, one live connection per user,
//!   `user_status` broadcasts on connect/disconnect
//! - **Delivery routing**: persist-then-deliver for direct messages and
//!   read receipts, live push to connected receivers, web-push fallback
//!   for offline ones, transient typing indicators
//! - **Notification fan-out**: social-action notifications over the same
//!   live/push decision
//! - **HTTP surface**: conversation/message/notification queries and
//!   mutations, push subscription lifecycle, health and metrics
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod health;
pub mod http;
pub mod metrics;
pub mod platform;
pub mod realtime;
pub mod server;
pub mod shutdown;
pub mod websocket;
