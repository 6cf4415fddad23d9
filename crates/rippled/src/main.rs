//! # rippled
//!
//! ripple backend server binary — wires together settings, storage, auth,
//! web push, and the HTTP/WebSocket server.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;

use ripple_server::auth::JwtVerifier;
use ripple_server::config::ServerConfig;
use ripple_server::platform::webpush::{self, PushTransport, WebPushService};
use ripple_server::server::RippleServer;
use ripple_store::{ChatStore, ConnectionConfig};

/// ripple backend server.
#[derive(Parser, Debug)]
#[command(name = "rippled", about = "ripple backend server")]
struct Cli {
    /// Host to bind (overrides settings if specified).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings if specified).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the `SQLite` database.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

impl Cli {
    fn default_db_path(configured: &str) -> PathBuf {
        let configured = PathBuf::from(configured);
        if configured.is_absolute() {
            return configured;
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".ripple").join(configured)
    }
}

fn ensure_parent_dir(path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Settings first (log level comes from them).
    let settings = ripple_settings::load_settings().unwrap_or_default();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| settings.logging.level.as_filter_str().to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .init();

    // Database.
    let db_path = args
        .db_path
        .unwrap_or_else(|| Cli::default_db_path(&settings.database.path));
    ensure_parent_dir(&db_path)?;
    let pool = ripple_store::new_file(
        &db_path.to_string_lossy(),
        &ConnectionConfig {
            pool_size: settings.database.pool_size,
            ..ConnectionConfig::default()
        },
    )
    .context("Failed to open database")?;
    {
        let conn = pool.get().context("Failed to get DB connection")?;
        let _ = ripple_store::run_migrations(&conn).context("Failed to run migrations")?;
    }
    let store = Arc::new(ChatStore::new(pool));

    // Auth — the server refuses to start without a verification secret.
    let Some(ref secret) = settings.auth.token_secret else {
        bail!("no auth.tokenSecret configured (settings.json or RIPPLE_TOKEN_SECRET)");
    };
    let verifier = Arc::new(JwtVerifier::new(secret));

    // Web push (optional — only if config exists at ~/.ripple/push/).
    let mut push_public_key = None;
    let push_transport: Option<Arc<dyn PushTransport>> =
        webpush::load_web_push_config().and_then(|push_config| {
            match WebPushService::new(push_config) {
                Ok(service) => {
                    push_public_key = Some(service.public_key().to_owned());
                    tracing::info!("web push service initialized — offline delivery enabled");
                    Some(Arc::new(service) as Arc<dyn PushTransport>)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "web push init failed — offline delivery disabled");
                    None
                }
            }
        });
    if push_transport.is_none() {
        tracing::info!("no web push config — offline delivery disabled");
    }

    // Metrics.
    let metrics_handle = ripple_server::metrics::install_recorder();

    // Server config: settings with CLI overrides.
    let mut config = ServerConfig::from(&settings);
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let server = RippleServer::new(
        config,
        store,
        verifier,
        push_transport,
        push_public_key,
        Some(metrics_handle),
    );

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("rippled listening on http://{addr}");

    // Wait for shutdown signal.
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.shutdown().shutdown();
    let _ = handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
