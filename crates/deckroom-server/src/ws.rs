use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ConnectInfo;
use axum::extract::FromRequest;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};

use deckroom_core::ConnectionId;
use deckroom_core::net::messages::ServerEvent;
use deckroom_core::net::protocol::{Codec, Frame, MAX_MESSAGE_SIZE, decode_client_frame};

use crate::state::{AppState, ConnectionGuard, IpConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> Result<axum::response::Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    // Per-IP connection limit
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));
    let max_per_ip = state.config.limits.max_ws_per_ip;
    let Some(ip_guard) = IpConnectionGuard::try_acquire(ip, Arc::clone(&state.ws_per_ip), max_per_ip)
    else {
        tracing::warn!(%ip, max_per_ip, "Per-IP WS connection limit reached");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    };

    let ws = WebSocketUpgrade::from_request(request, &state)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, ip_guard))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState, _ip_guard: IpConnectionGuard) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let connection_id = ConnectionId::new();
    let (ws_sender, mut ws_receiver) = socket.split();

    let (tx, rx) = mpsc::channel::<ServerEvent>(state.config.limits.player_message_buffer);
    let (codec_tx, codec_rx) = watch::channel(Codec::default());

    state.lobby.write().await.connect(connection_id, tx);
    tracing::info!(connection = %connection_id, "Client connected");

    spawn_writer(ws_sender, rx, codec_rx, connection_id);

    read_loop(&mut ws_receiver, &state, connection_id, &codec_tx).await;

    // Dropping the sender inside `disconnect` ends the writer task.
    state.lobby.write().await.disconnect(connection_id);
    tracing::info!(connection = %connection_id, "Client disconnected");
}

/// Encode queued notifications with the connection's current codec and
/// push them onto the socket.
fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<ServerEvent>,
    codec: watch::Receiver<Codec>,
    connection_id: ConnectionId,
) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let current = *codec.borrow();
            let frame = match current.encode_server(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(connection = %connection_id, error = %e, "Failed to encode event");
                    continue;
                },
            };
            let msg = match frame {
                Frame::Text(text) => Message::Text(text.into()),
                Frame::Binary(data) => Message::Binary(data.into()),
            };
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    connection_id: ConnectionId,
    codec: &watch::Sender<Codec>,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let frame = match msg {
            Message::Text(t) => Frame::Text(t.as_str().to_owned()),
            Message::Binary(d) => Frame::Binary(d.to_vec()),
            Message::Close(_) => break,
            _ => continue,
        };

        if frame.is_empty() {
            continue;
        }

        if !rate_limiter.allow() {
            tracing::warn!(connection = %connection_id, "Rate limited");
            continue;
        }

        if frame.len() > MAX_MESSAGE_SIZE {
            tracing::warn!(
                connection = %connection_id,
                size = frame.len(),
                "Oversized message dropped"
            );
            continue;
        }

        match decode_client_frame(&frame) {
            Ok(event) => {
                // Reply in whatever encoding the client last spoke successfully.
                codec.send_replace(frame.codec());
                tracing::debug!(
                    connection = %connection_id,
                    msg_type = ?event.message_type(),
                    "Client event"
                );
                state.lobby.write().await.handle_event(connection_id, event);
            },
            Err(e) => {
                tracing::debug!(connection = %connection_id, error = %e, "Malformed message");
                state
                    .lobby
                    .read()
                    .await
                    .send_to(connection_id, ServerEvent::error(format!("Malformed message: {e}")));
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_limiter_exhausts_then_refills() {
        let mut limiter = RateLimiter::new(2.0, 100.0);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(limiter.allow());
    }

    #[tokio::test]
    async fn rate_limiter_without_refill_stays_empty() {
        let mut limiter = RateLimiter::new(1.0, 0.0);
        assert!(limiter.allow());
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(!limiter.allow());
    }
}
