use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use deckroom_core::net::messages::{
    ClientEvent, CreateGameMsg, GameCreatedMsg, JoinGameMsg, ServerEvent, StartGameMsg,
};
use deckroom_core::net::protocol::{Codec, Frame, decode_server_frame};

use deckroom_server::build_app;
use deckroom_server::config::ServerConfig;
use deckroom_server::state::AppState;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            state,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a client event encoded with `codec`.
pub async fn ws_send(stream: &mut WsStream, codec: Codec, event: &ClientEvent) {
    let msg = match codec.encode_client(event).unwrap() {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(data) => Message::Binary(data.into()),
    };
    stream.send(msg).await.unwrap();
}

/// Send a client event as a JSON text frame.
pub async fn ws_send_json(stream: &mut WsStream, event: &ClientEvent) {
    ws_send(stream, Codec::Json, event).await;
}

/// Send an arbitrary text frame, valid or not.
pub async fn ws_send_text(stream: &mut WsStream, text: &str) {
    stream.send(Message::Text(text.into())).await.unwrap();
}

/// Read the next data frame (5s timeout).
pub async fn ws_read_frame(stream: &mut WsStream) -> Frame {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Frame::Text(text.as_str().to_owned()),
                Some(Ok(Message::Binary(data))) => return Frame::Binary(data.to_vec()),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Read and decode the next server event (5s timeout).
pub async fn ws_read_event(stream: &mut WsStream) -> ServerEvent {
    let frame = ws_read_frame(stream).await;
    decode_server_frame(&frame).unwrap()
}

/// Try to read a server event, returning None on timeout.
pub async fn ws_try_read_event(stream: &mut WsStream, timeout_ms: u64) -> Option<ServerEvent> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, ws_read_event(stream))
        .await
        .ok()
}

pub fn create_game(game_id: &str, name: &str) -> ClientEvent {
    ClientEvent::CreateGame(CreateGameMsg {
        game_id: game_id.to_string(),
        player_name: name.to_string(),
    })
}

pub fn join_game(game_id: &str, name: &str) -> ClientEvent {
    ClientEvent::JoinGame(JoinGameMsg {
        game_id: game_id.to_string(),
        player_name: name.to_string(),
    })
}

pub fn start_game(game_id: &str) -> ClientEvent {
    ClientEvent::StartGame(StartGameMsg {
        game_id: game_id.to_string(),
    })
}

/// Create a game over JSON and return the confirmation.
pub async fn ws_create_game(stream: &mut WsStream, game_id: &str, name: &str) -> GameCreatedMsg {
    ws_send_json(stream, &create_game(game_id, name)).await;
    match ws_read_event(stream).await {
        ServerEvent::GameCreated(created) => created,
        other => panic!("Expected GameCreated, got: {other:?}"),
    }
}

/// Send a JoinGame over JSON and return whatever the joiner receives first.
pub async fn ws_join_game(stream: &mut WsStream, game_id: &str, name: &str) -> ServerEvent {
    ws_send_json(stream, &join_game(game_id, name)).await;
    ws_read_event(stream).await
}
