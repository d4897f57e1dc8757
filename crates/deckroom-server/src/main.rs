use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use deckroom_server::config::ServerConfig;
use deckroom_server::{build_app, spawn_idle_sweeper};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("DECKROOM_LOG_JSON").is_ok_and(|v| v == "1") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = ServerConfig::load();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {e}");
        std::process::exit(1);
    }
    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        },
    };

    let (app, state) = build_app(config);
    let shutdown = CancellationToken::new();
    let sweeper = spawn_idle_sweeper(state, shutdown.clone());

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, "Failed to bind: {e}");
            std::process::exit(1);
        },
    };

    tracing::info!(%addr, "Deckroom server listening");

    let signal = shutdown.clone();
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown signal received"),
            _ = signal.cancelled() => {}
        }
    })
    .await;

    shutdown.cancel();
    let _ = sweeper.await;

    if let Err(e) = served {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
    tracing::info!("Deckroom server stopped");
}
