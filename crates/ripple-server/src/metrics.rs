//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Events dropped because a client channel was full (counter).
pub const WS_SEND_DROPS_TOTAL: &str = "ws_send_drops_total";
/// WebSocket connection duration seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Direct messages routed total (counter, labels: path = live|push|none).
pub const MESSAGES_ROUTED_TOTAL: &str = "messages_routed_total";
/// Read receipts routed total (counter).
pub const READ_RECEIPTS_TOTAL: &str = "read_receipts_total";
/// Typing indicators forwarded total (counter).
pub const TYPING_FORWARDED_TOTAL: &str = "typing_forwarded_total";
/// Notifications fanned out total (counter, labels: path = live|push|none).
pub const NOTIFICATIONS_DELIVERED_TOTAL: &str = "notifications_delivered_total";
/// Push deliveries attempted total (counter).
pub const PUSH_SENDS_TOTAL: &str = "push_sends_total";
/// Push delivery failures total (counter, labels: reason = gone|error).
pub const PUSH_FAILURES_TOTAL: &str = "push_failures_total";
/// Push subscriptions pruned total (counter).
pub const PUSH_SUBSCRIPTIONS_PRUNED_TOTAL: &str = "push_subscriptions_pruned_total";
