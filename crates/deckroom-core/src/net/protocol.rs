use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::messages::{
    ClientEvent, CreateGameMsg, ErrorMsg, GameCreatedMsg, GameStartedMsg, JoinGameMsg,
    JoinedGameMsg, MessageType, PlayerJoinedMsg, PlayerLeftMsg, ServerEvent, StartGameMsg,
};

/// Maximum frame size in bytes, for both codecs.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty message")]
    EmptyMessage,
    #[error("unknown message type: 0x{0:02x}")]
    UnknownMessageType(u8),
    #[error("payload too large: {0} bytes (max {MAX_MESSAGE_SIZE})")]
    PayloadTooLarge(usize),
    #[error("serialize error: {0}")]
    SerializeError(String),
    #[error("deserialize error: {0}")]
    DeserializeError(String),
}

/// Wire encoding chosen by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// `{"event": "...", "data": {...}}` text frames.
    #[default]
    Json,
    /// Type-prefixed MessagePack binary frames.
    MessagePack,
}

/// One encoded frame, independent of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The codec a peer used to produce this frame.
    pub fn codec(&self) -> Codec {
        match self {
            Self::Text(_) => Codec::Json,
            Self::Binary(_) => Codec::MessagePack,
        }
    }
}

impl Codec {
    pub fn encode_server(self, event: &ServerEvent) -> Result<Frame, ProtocolError> {
        match self {
            Self::Json => encode_json(event).map(Frame::Text),
            Self::MessagePack => encode_server_message(event).map(Frame::Binary),
        }
    }

    pub fn encode_client(self, event: &ClientEvent) -> Result<Frame, ProtocolError> {
        match self {
            Self::Json => encode_json(event).map(Frame::Text),
            Self::MessagePack => encode_client_message(event).map(Frame::Binary),
        }
    }
}

/// Decode an inbound frame with whichever codec produced it.
pub fn decode_client_frame(frame: &Frame) -> Result<ClientEvent, ProtocolError> {
    match frame {
        Frame::Text(s) => decode_json(s),
        Frame::Binary(b) => decode_client_message(b),
    }
}

/// Decode an outbound frame with whichever codec produced it.
pub fn decode_server_frame(frame: &Frame) -> Result<ServerEvent, ProtocolError> {
    match frame {
        Frame::Text(s) => decode_json(s),
        Frame::Binary(b) => decode_server_message(b),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

pub fn encode_json<T: Serialize>(event: &T) -> Result<String, ProtocolError> {
    let text =
        serde_json::to_string(event).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(text.len()));
    }
    Ok(text)
}

pub fn decode_json<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, ProtocolError> {
    if text.trim().is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(text.len()));
    }
    serde_json::from_str(text).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

// ---------------------------------------------------------------------------
// MessagePack
// ---------------------------------------------------------------------------

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

pub fn encode_client_message(event: &ClientEvent) -> Result<Vec<u8>, ProtocolError> {
    match event {
        ClientEvent::CreateGame(m) => encode_message(MessageType::CreateGame, m),
        ClientEvent::JoinGame(m) => encode_message(MessageType::JoinGame, m),
        ClientEvent::StartGame(m) => encode_message(MessageType::StartGame, m),
        ClientEvent::LeaveGame => Ok(vec![MessageType::LeaveGame as u8]),
    }
}

pub fn encode_server_message(event: &ServerEvent) -> Result<Vec<u8>, ProtocolError> {
    match event {
        ServerEvent::GameCreated(m) => encode_message(MessageType::GameCreated, m),
        ServerEvent::JoinedGame(m) => encode_message(MessageType::JoinedGame, m),
        ServerEvent::PlayerJoined(m) => encode_message(MessageType::PlayerJoined, m),
        ServerEvent::GameStarted(m) => encode_message(MessageType::GameStarted, m),
        ServerEvent::PlayerLeft(m) => encode_message(MessageType::PlayerLeft, m),
        ServerEvent::Error(m) => encode_message(MessageType::Error, m),
        ServerEvent::GameNotFound | ServerEvent::GameFull => Ok(vec![event.message_type() as u8]),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    let Some(&first) = data.first() else {
        return Err(ProtocolError::EmptyMessage);
    };
    MessageType::from_byte(first).ok_or(ProtocolError::UnknownMessageType(first))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

pub fn decode_client_message(data: &[u8]) -> Result<ClientEvent, ProtocolError> {
    match decode_message_type(data)? {
        MessageType::CreateGame => Ok(ClientEvent::CreateGame(decode_payload::<CreateGameMsg>(
            data,
        )?)),
        MessageType::JoinGame => Ok(ClientEvent::JoinGame(decode_payload::<JoinGameMsg>(data)?)),
        MessageType::StartGame => Ok(ClientEvent::StartGame(decode_payload::<StartGameMsg>(
            data,
        )?)),
        MessageType::LeaveGame => Ok(ClientEvent::LeaveGame),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

pub fn decode_server_message(data: &[u8]) -> Result<ServerEvent, ProtocolError> {
    match decode_message_type(data)? {
        MessageType::GameCreated => Ok(ServerEvent::GameCreated(decode_payload::<
            GameCreatedMsg,
        >(data)?)),
        MessageType::JoinedGame => Ok(ServerEvent::JoinedGame(decode_payload::<JoinedGameMsg>(
            data,
        )?)),
        MessageType::PlayerJoined => Ok(ServerEvent::PlayerJoined(decode_payload::<
            PlayerJoinedMsg,
        >(data)?)),
        MessageType::GameStarted => Ok(ServerEvent::GameStarted(decode_payload::<
            GameStartedMsg,
        >(data)?)),
        MessageType::PlayerLeft => Ok(ServerEvent::PlayerLeft(decode_payload::<PlayerLeftMsg>(
            data,
        )?)),
        MessageType::GameNotFound => Ok(ServerEvent::GameNotFound),
        MessageType::GameFull => Ok(ServerEvent::GameFull),
        MessageType::Error => Ok(ServerEvent::Error(decode_payload::<ErrorMsg>(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
