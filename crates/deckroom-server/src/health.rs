use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Minimal status document served at `/`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
    pub active_games: usize,
}

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: ConnectionInfo,
    pub sessions: SessionInfo,
}

#[derive(Serialize)]
pub struct ConnectionInfo {
    pub websocket: usize,
}

#[derive(Serialize)]
pub struct SessionInfo {
    pub active: usize,
    pub players: usize,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let active_games = state.lobby.read().await.registry().active_sessions();
    Json(StatusResponse {
        status: "ok",
        message: state.config.status_message.clone(),
        active_games,
    })
}

/// Server status, connection count, and session totals as JSON.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let websocket = state.ws_connection_count.load(Ordering::Relaxed);
    let (active, players) = state.lobby.read().await.registry().stats();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connections: ConnectionInfo { websocket },
        sessions: SessionInfo { active, players },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use deckroom_core::ConnectionId;

    #[test]
    fn status_response_uses_camel_case() {
        let resp = StatusResponse {
            status: "ok",
            message: "running".into(),
            active_games: 3,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["activeGames"], 3);
    }

    #[tokio::test]
    async fn status_counts_sessions() {
        let state = AppState::new(ServerConfig::default());
        {
            let mut lobby = state.lobby.write().await;
            let (tx, _rx) = tokio::sync::mpsc::channel(4);
            let id = ConnectionId::new();
            lobby.connect(id, tx);
            lobby.handle_event(
                id,
                deckroom_core::net::messages::ClientEvent::CreateGame(
                    deckroom_core::net::messages::CreateGameMsg {
                        game_id: "G1".into(),
                        player_name: "Alice".into(),
                    },
                ),
            );
        }

        let Json(resp) = status(State(state.clone())).await;
        assert_eq!(resp.active_games, 1);
        assert_eq!(resp.message, "Deckroom server running");

        let Json(health) = health_check(State(state)).await;
        assert_eq!(health.sessions.active, 1);
        assert_eq!(health.sessions.players, 1);
        assert_eq!(health.connections.websocket, 0);
    }
}
