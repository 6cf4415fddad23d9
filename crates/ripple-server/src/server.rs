//! `RippleServer` — Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::{delete, get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use ripple_store::ChatStore;

use crate::auth::TokenVerifier;
use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::http;
use crate::platform::webpush::PushTransport;
use crate::realtime::fanout::NotificationFanout;
use crate::realtime::push::PushChannel;
use crate::realtime::router::{DeliveryRouter, SendLimits};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::presence::PresenceRegistry;
use crate::websocket::session::ws_handler;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistence facade.
    pub store: Arc<ChatStore>,
    /// Presence registry (who is online in this process).
    pub presence: Arc<PresenceRegistry>,
    /// Delivery router shared by the WebSocket and HTTP paths.
    pub delivery: Arc<DeliveryRouter>,
    /// Social-action notification fan-out.
    pub fanout: Arc<NotificationFanout>,
    /// Credential verifier.
    pub verifier: Arc<dyn TokenVerifier>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Prometheus render handle (absent in unit tests).
    pub metrics: Option<PrometheusHandle>,
}

/// The main ripple server.
pub struct RippleServer {
    state: AppState,
}

impl RippleServer {
    /// Create a new server, wiring the presence registry, push channel,
    /// delivery router, and fan-out over the shared store.
    pub fn new(
        config: ServerConfig,
        store: Arc<ChatStore>,
        verifier: Arc<dyn TokenVerifier>,
        push_transport: Option<Arc<dyn PushTransport>>,
        push_public_key: Option<String>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        let push = Arc::new(PushChannel::new(
            store.clone(),
            push_transport,
            push_public_key,
        ));
        let limits = SendLimits {
            max_content_chars: config.max_content_chars,
            max_attachments: config.max_attachments,
        };
        let delivery = Arc::new(DeliveryRouter::new(
            store.clone(),
            presence.clone(),
            push.clone(),
            limits,
        ));
        let fanout = Arc::new(NotificationFanout::new(
            store.clone(),
            presence.clone(),
            push,
        ));

        Self {
            state: AppState {
                store,
                presence,
                delivery,
                fanout,
                verifier,
                shutdown: Arc::new(ShutdownCoordinator::new()),
                start_time: Instant::now(),
                config: Arc::new(config),
                metrics,
            },
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(ws_handler))
            .route("/api/conversations", get(http::conversations::list))
            .route("/api/conversations/{id}", get(http::conversations::get_one))
            .route(
                "/api/conversations/{id}",
                delete(http::conversations::delete_one),
            )
            .route(
                "/api/conversations/{id}/read",
                post(http::conversations::mark_read),
            )
            .route(
                "/api/conversations/{id}/pin",
                post(http::conversations::toggle_pin),
            )
            .route(
                "/api/conversations/{id}/mute",
                post(http::conversations::toggle_mute),
            )
            .route(
                "/api/conversations/{id}/messages",
                get(http::messages::history),
            )
            .route("/api/messages", post(http::messages::send))
            .route("/api/messages/{id}/read", post(http::messages::mark_read))
            .route("/api/notifications", get(http::notifications::list))
            .route(
                "/api/notifications/unread-count",
                get(http::notifications::unread_count),
            )
            .route(
                "/api/notifications/{id}/read",
                post(http::notifications::mark_read),
            )
            .route("/api/push/public-key", get(http::push::public_key))
            .route("/api/push/subscribe", post(http::push::subscribe))
            .route(
                "/api/push/subscriptions/{endpoint}",
                delete(http::push::unsubscribe),
            )
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind and serve. Returns the bound address and the serve task handle.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let addr = format!("{}:{}", self.state.config.host, self.state.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;

        let app = self.router();
        let token = self.state.shutdown.token();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                tracing::error!(error = %e, "server error");
            }
        });

        Ok((local_addr, handle))
    }

    /// Get the shared state (for wiring collaborators in the binary).
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get the presence registry.
    pub fn presence(&self) -> &Arc<PresenceRegistry> {
        &self.state.presence
    }

    /// Get the notification fan-out.
    pub fn fanout(&self) -> &Arc<NotificationFanout> {
        &self.state.fanout
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let online = state.presence.online_count();
    let resp = health::health_check(state.start_time, online, online);
    Json(resp)
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    state
        .metrics
        .as_ref()
        .map(crate::metrics::render)
        .unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtVerifier;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use ripple_core::UserId;
    use ripple_store::{ConnectionConfig, new_in_memory, run_migrations};
    use tower::ServiceExt;

    fn make_store() -> Arc<ChatStore> {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        let store = ChatStore::new(pool);
        store
            .upsert_user(&UserId::from("u1"), "ada", None, None)
            .unwrap();
        Arc::new(store)
    }

    fn make_server() -> RippleServer {
        RippleServer::new(
            ServerConfig::default(),
            make_store(),
            Arc::new(JwtVerifier::new("test-secret")),
            None,
            None,
            None,
        )
    }

    fn bearer(sub: &str) -> String {
        use jsonwebtoken::{Algorithm, EncodingKey, Header};
        let claims = crate::auth::TokenClaims {
            sub: sub.into(),
            username: "ada".into(),
            display_name: None,
            avatar: None,
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = make_server().router();

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert!(parsed["connections"].is_number());
    }

    #[tokio::test]
    async fn metrics_endpoint_exists() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/nonexistent")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn conversations_require_auth() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/api/conversations")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn conversations_list_with_auth() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/api/conversations")
            .header("authorization", bearer("u1"))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["total"], 0);
        assert_eq!(parsed["page"], 1);
        assert_eq!(parsed["hasMore"], false);
        assert!(parsed["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_token_rejected() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/api/conversations")
            .header("authorization", "Bearer garbage")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn ws_upgrade_without_token_rejected() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/ws")
            .header("connection", "upgrade")
            .header("upgrade", "websocket")
            .header("sec-websocket-version", "13")
            .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn push_public_key_404_when_disabled() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/api/push/public-key")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn push_public_key_served_when_configured() {
        let server = RippleServer::new(
            ServerConfig::default(),
            make_store(),
            Arc::new(JwtVerifier::new("test-secret")),
            None,
            Some("BPubKey".into()),
            None,
        );
        let req = Request::builder()
            .uri("/api/push/public-key")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["publicKey"], "BPubKey");
    }

    #[tokio::test]
    async fn send_message_http_path() {
        let server = make_server();
        server
            .state()
            .store
            .upsert_user(&UserId::from("u2"), "grace", None, None)
            .unwrap();
        let app = server.router();

        let req = Request::builder()
            .method("POST")
            .uri("/api/messages")
            .header("authorization", bearer("u1"))
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"receiverId": "u2", "content": "hello"}).to_string(),
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["senderId"], "u1");
        assert_eq!(parsed["receiverId"], "u2");
        assert_eq!(parsed["content"], "hello");
        assert_eq!(parsed["isRead"], false);
    }

    #[tokio::test]
    async fn send_empty_message_is_400() {
        let server = make_server();
        server
            .state()
            .store
            .upsert_user(&UserId::from("u2"), "grace", None, None)
            .unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/api/messages")
            .header("authorization", bearer("u1"))
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"receiverId": "u2", "content": "  "}).to_string(),
            ))
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn foreign_conversation_is_403() {
        let server = make_server();
        let store = server.state().store.clone();
        for (id, name) in [("u2", "grace"), ("u3", "edsger")] {
            store.upsert_user(&UserId::from(id), name, None, None).unwrap();
        }
        let outcome = store
            .record_message(&ripple_store::NewMessage {
                sender: "u2",
                receiver: "u3",
                content: "private",
                attachments: &[],
            })
            .unwrap();

        let req = Request::builder()
            .uri(format!("/api/conversations/{}", outcome.conversation.id))
            .header("authorization", bearer("u1"))
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_conversation_is_404() {
        let server = make_server();
        let req = Request::builder()
            .uri("/api/conversations/no-such-id")
            .header("authorization", bearer("u1"))
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn shutdown_propagates_to_coordinator() {
        let server = make_server();
        assert!(!server.shutdown().is_shutting_down());
        server.shutdown().shutdown();
        assert!(server.shutdown().is_shutting_down());
    }

    #[tokio::test]
    async fn listen_binds_and_shuts_down() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        server.shutdown().shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("shutdown timed out")
            .expect("join error");
    }
}
