//! WebSocket session lifecycle — authentication at upgrade time, event
//! dispatch, heartbeat, and disconnect cleanup.
//!
//! The credential is verified before the socket is registered: a missing or
//! unverifiable token rejects the upgrade with 401 and no session state is
//! created. On success the connection is registered in the presence
//! registry, `auth_success` is sent to the new connection, and peers are
//! told the user came online.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use metrics::{counter, histogram};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use ripple_core::UserId;

use crate::auth::AuthedUser;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL,
};
use crate::realtime::events::{self, ClientEvent, ServerEvent};
use crate::realtime::router::ReadTarget;
use crate::server::AppState;

use super::connection::ClientConnection;

/// Query parameters on the upgrade request.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Connection-time credential.
    #[serde(default)]
    token: String,
}

/// GET /ws — authenticate, then upgrade.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let user = match state.verifier.verify(&query.token) {
        Ok(user) => user,
        Err(e) => {
            info!(error = %e, "websocket upgrade rejected");
            return (StatusCode::UNAUTHORIZED, e.to_string()).into_response();
        }
    };
    upgrade
        .on_upgrade(move |socket| run_ws_session(socket, user, state))
        .into_response()
}

/// Run a WebSocket session for an authenticated client.
///
/// 1. Registers the connection (last registration per user wins)
/// 2. Sends `auth_success`, broadcasts the `online` status change
/// 3. Dispatches inbound events to the delivery router
/// 4. Sends periodic Ping frames and disconnects unresponsive clients
/// 5. Cleans up presence and typing state on disconnect
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn run_ws_session(ws: WebSocket, user: AuthedUser, state: AppState) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(256);
    let connection = Arc::new(ClientConnection::new(
        uuid::Uuid::now_v7().to_string(),
        user.user_id.clone(),
        send_tx,
    ));

    // Keep the profile row fresh for display enrichment.
    if let Err(e) = state.store.upsert_user(
        &user.user_id,
        &user.username,
        user.display_name.as_deref(),
        user.avatar.as_deref(),
    ) {
        warn!(error = %e, "failed to refresh profile row");
    }

    let connection_start = std::time::Instant::now();
    info!(connection_id = %connection.id, "client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);

    let replaced = state.presence.register(connection.clone()).await;
    if let Some(old) = replaced {
        debug!(old_connection = %old.id, "replaced earlier connection for user");
    } else {
        state.presence.broadcast_status(&user.user_id, true).await;
    }

    let _ = connection.send_event(&ServerEvent::new(
        events::AUTH_SUCCESS,
        serde_json::json!({
            "userId": user.user_id.as_str(),
            "username": user.username,
        }),
    ));

    // Outbound forwarder with periodic Ping frames.
    let ping_interval = Duration::from_millis(state.config.heartbeat_interval_ms);
    let pong_timeout = Duration::from_millis(state.config.heartbeat_timeout_ms);
    let outbound_conn = connection.clone();
    let outbound = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        // Skip the immediate first tick
        let _ = ticker.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > pong_timeout
                    {
                        warn!("client unresponsive for {pong_timeout:?}, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Inbound loop.
    while let Some(Ok(msg)) = ws_rx.next().await {
        let text = match msg {
            Message::Text(ref t) => Some(t.to_string()),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(s) => Some(s.to_string()),
                Err(_) => {
                    info!(len = data.len(), "received non-UTF8 binary frame");
                    None
                }
            },
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                connection.mark_alive();
                None
            }
        };

        let Some(text) = text else { continue };
        connection.mark_alive();
        dispatch_client_event(&text, &user, &connection, &state).await;
    }

    // Clean up.
    info!("client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection_start.elapsed().as_secs_f64());
    outbound.abort();

    if state.presence.remove(&user.user_id, &connection.id).await {
        state.presence.broadcast_status(&user.user_id, false).await;
    }
    state.delivery.clear_typing(&user.user_id).await;
}

/// Parse and dispatch one inbound frame.
async fn dispatch_client_event(
    text: &str,
    user: &AuthedUser,
    connection: &Arc<ClientConnection>,
    state: &AppState,
) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            debug!(error = %e, "unparseable client event");
            let _ = connection.send_event(&ServerEvent::new(
                events::MESSAGE_ERROR,
                serde_json::json!({ "error": format!("invalid event: {e}") }),
            ));
            return;
        }
    };

    match event {
        ClientEvent::SendMessage {
            receiver_id,
            content,
            attachments,
        } => {
            let receiver = UserId::from_string(receiver_id);
            if let Err(e) = state
                .delivery
                .route_message(&user.user_id, &receiver, &content, &attachments)
                .await
            {
                debug!(error = %e, "send rejected");
                let _ = connection.send_event(&ServerEvent::new(
                    events::MESSAGE_ERROR,
                    serde_json::json!({ "error": e.to_string() }),
                ));
            }
        }
        ClientEvent::MarkRead {
            conversation_id,
            message_id,
        } => {
            let result = match (conversation_id, message_id) {
                (Some(conversation), _) => {
                    state
                        .delivery
                        .route_read_receipt(&user.user_id, ReadTarget::Conversation(&conversation))
                        .await
                }
                (None, Some(message)) => {
                    state
                        .delivery
                        .route_read_receipt(&user.user_id, ReadTarget::Message(&message))
                        .await
                }
                (None, None) => {
                    let _ = connection.send_event(&ServerEvent::new(
                        events::MESSAGE_ERROR,
                        serde_json::json!({ "error": "mark_read requires conversationId or messageId" }),
                    ));
                    return;
                }
            };
            if let Err(e) = result {
                warn!(error = %e, "mark_read failed");
            }
        }
        ClientEvent::Typing {
            receiver_id,
            is_typing,
        } => {
            let receiver = UserId::from_string(receiver_id);
            state
                .delivery
                .route_typing(&user.user_id, &receiver, is_typing)
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    // Session behavior over a real socket is covered by tests/integration.rs;
    // unit tests here validate the envelope helpers used by the loop.

    use crate::realtime::events::{self, ServerEvent};

    #[test]
    fn auth_success_event_shape() {
        let event = ServerEvent::new(
            events::AUTH_SUCCESS,
            serde_json::json!({ "userId": "u1", "username": "ada" }),
        );
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["type"], "auth_success");
        assert_eq!(v["data"]["userId"], "u1");
        assert!(v["timestamp"].is_string());
    }

    #[test]
    fn error_event_shape() {
        let event = ServerEvent::new(
            events::MESSAGE_ERROR,
            serde_json::json!({ "error": "message is empty" }),
        );
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["type"], "message_error");
        assert_eq!(v["data"]["error"], "message is empty");
    }
}
