//! editor-service binary
//!
//! Serves the file API over HTTP, backed by the configured blob and secret
//! stores.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use editor_service::{AppState, Config};

#[derive(Parser, Debug)]
#[command(name = "editor-service")]
#[command(about = "Token-gated file API for bucket-editor")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 8788, env = "EDITOR_PORT")]
    port: u16,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "EDITOR_BIND")]
    bind: String,

    /// Path to config directory
    #[arg(long, default_value = "./config", env = "EDITOR_CONFIG_PATH")]
    config_path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "editor_service=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config_path)?;
    let blobs = config.open_blob_store(&cli.config_path).await?;
    let secrets = config.open_secret_store(&cli.config_path);

    if secrets.get(&config.secrets.token_name).await?.is_none() {
        tracing::warn!(
            "No API token is set under '{}'; every request will be rejected until it is",
            config.secrets.token_name
        );
    }

    let state = Arc::new(AppState::new(
        blobs,
        secrets,
        config.secrets.token_name.clone(),
    ));
    let app = editor_service::app(state, &config);

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    tracing::info!("Starting editor-service on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Editor service shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    };

    tracing::info!("{} received, draining in-flight requests", received);
}
