pub mod config;
pub mod health;
pub mod lobby;
pub mod state;
pub mod ws;

use std::time::Instant;

use axum::Router;
use axum::http::Method;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST]);

    let app = Router::new()
        .route("/", axum::routing::get(health::status))
        .route("/health", axum::routing::get(health::health_check))
        .route("/ws", axum::routing::get(ws::ws_handler))
        .layer(cors)
        .with_state(state.clone());

    (app, state)
}

/// Background task that periodically reclaims idle sessions until `shutdown`
/// is cancelled.
pub fn spawn_idle_sweeper(state: AppState, shutdown: CancellationToken) -> JoinHandle<()> {
    let idle_timeout = state.config.sessions.idle_timeout();
    let mut interval = tokio::time::interval(state.config.sessions.sweep_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tokio::spawn(async move {
        // The first tick completes immediately; nothing can be idle yet.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Idle sweeper stopping");
                    break;
                }
                _ = interval.tick() => {
                    let removed = state.lobby.write().await.sweep(Instant::now(), idle_timeout);
                    if !removed.is_empty() {
                        tracing::info!(
                            count = removed.len(),
                            sessions = ?removed,
                            "Reclaimed idle sessions"
                        );
                    }
                }
            }
        }
    })
}
