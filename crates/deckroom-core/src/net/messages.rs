use serde::{Deserialize, Serialize};

use crate::error::LobbyError;
use crate::player::{ConnectionId, Player};
use crate::session::SessionId;

/// Binary message type discriminator (first byte of a MessagePack frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    CreateGame = 0x01,
    JoinGame = 0x02,
    StartGame = 0x03,
    LeaveGame = 0x04,

    // Server -> Client
    GameCreated = 0x10,
    JoinedGame = 0x11,
    PlayerJoined = 0x12,
    GameStarted = 0x13,
    PlayerLeft = 0x14,

    // Server -> Client (errors)
    GameNotFound = 0x20,
    GameFull = 0x21,
    Error = 0x22,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::CreateGame),
            0x02 => Some(Self::JoinGame),
            0x03 => Some(Self::StartGame),
            0x04 => Some(Self::LeaveGame),
            0x10 => Some(Self::GameCreated),
            0x11 => Some(Self::JoinedGame),
            0x12 => Some(Self::PlayerJoined),
            0x13 => Some(Self::GameStarted),
            0x14 => Some(Self::PlayerLeft),
            0x20 => Some(Self::GameNotFound),
            0x21 => Some(Self::GameFull),
            0x22 => Some(Self::Error),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameMsg {
    pub game_id: SessionId,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameMsg {
    pub game_id: SessionId,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameMsg {
    pub game_id: SessionId,
}

/// Inbound events. On the JSON wire these are `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    CreateGame(CreateGameMsg),
    JoinGame(JoinGameMsg),
    StartGame(StartGameMsg),
    /// Leave the current game without closing the connection.
    LeaveGame,
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCreatedMsg {
    pub game_id: SessionId,
    pub player_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedGameMsg {
    pub game_id: SessionId,
    pub player_id: ConnectionId,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoinedMsg {
    pub player_name: String,
    pub player_id: ConnectionId,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartedMsg {
    pub started_by: ConnectionId,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeftMsg {
    pub player_id: ConnectionId,
    pub player_name: String,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub message: String,
}

/// Outbound notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    GameCreated(GameCreatedMsg),
    JoinedGame(JoinedGameMsg),
    PlayerJoined(PlayerJoinedMsg),
    GameStarted(GameStartedMsg),
    PlayerLeft(PlayerLeftMsg),
    GameNotFound,
    GameFull,
    Error(ErrorMsg),
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorMsg {
            message: message.into(),
        })
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Self::GameCreated(_) => MessageType::GameCreated,
            Self::JoinedGame(_) => MessageType::JoinedGame,
            Self::PlayerJoined(_) => MessageType::PlayerJoined,
            Self::GameStarted(_) => MessageType::GameStarted,
            Self::PlayerLeft(_) => MessageType::PlayerLeft,
            Self::GameNotFound => MessageType::GameNotFound,
            Self::GameFull => MessageType::GameFull,
            Self::Error(_) => MessageType::Error,
        }
    }
}

impl From<LobbyError> for ServerEvent {
    /// Missing and full games have dedicated events; everything else is a
    /// generic error carrying the human-readable message.
    fn from(err: LobbyError) -> Self {
        match err {
            LobbyError::SessionNotFound => Self::GameNotFound,
            LobbyError::SessionFull => Self::GameFull,
            other => Self::error(other.to_string()),
        }
    }
}

impl ClientEvent {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::CreateGame(_) => MessageType::CreateGame,
            Self::JoinGame(_) => MessageType::JoinGame,
            Self::StartGame(_) => MessageType::StartGame,
            Self::LeaveGame => MessageType::LeaveGame,
        }
    }
}
