use std::time::Instant;

use crate::error::LobbyError;
use crate::player::{ConnectionId, Player};

/// Caller-supplied session key (the `gameId` on the wire).
pub type SessionId = String;

/// Hard cap on players per session.
pub const MAX_PLAYERS: usize = 4;

/// Longest accepted display name, in characters, after trimming.
pub const MAX_NAME_LEN: usize = 32;

/// Longest accepted session id, in characters.
pub const MAX_SESSION_ID_LEN: usize = 64;

/// A joinable group of one to four players sharing a game identity.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub host: ConnectionId,
    /// Join order. The first entry is the earliest remaining joiner.
    pub players: Vec<Player>,
    pub created_at: Instant,
    pub last_activity: Instant,
}

impl Session {
    pub(crate) fn new(id: SessionId, host: Player, now: Instant) -> Self {
        Self {
            id,
            host: host.connection_id,
            players: vec![host],
            created_at: now,
            last_activity: now,
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    pub fn has_name(&self, display_name: &str) -> bool {
        self.players.iter().any(|p| p.display_name == display_name)
    }

    pub fn player(&self, connection_id: ConnectionId) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.connection_id == connection_id)
    }

    /// Connection ids of every member, in join order.
    pub fn members(&self) -> Vec<ConnectionId> {
        self.players.iter().map(|p| p.connection_id).collect()
    }

    /// Remove a player. Returns the removed record if present.
    pub(crate) fn remove_player(&mut self, connection_id: ConnectionId) -> Option<Player> {
        let index = self
            .players
            .iter()
            .position(|p| p.connection_id == connection_id)?;
        Some(self.players.remove(index))
    }

    /// Hand host authority to the earliest remaining player.
    pub(crate) fn promote_first(&mut self) {
        if let Some(first) = self.players.first() {
            self.host = first.connection_id;
        }
        for p in &mut self.players {
            p.is_host = p.connection_id == self.host;
        }
    }
}

/// Trim and validate a display name. Returns the trimmed name.
pub fn validate_player_name(name: &str) -> Result<String, LobbyError> {
    let name = name.trim();
    if name.is_empty()
        || name.chars().count() > MAX_NAME_LEN
        || name.chars().any(char::is_control)
    {
        return Err(LobbyError::InvalidName);
    }
    Ok(name.to_string())
}

/// Validate a caller-supplied session id. Ids are taken verbatim (not trimmed).
pub fn validate_session_id(id: &str) -> Result<(), LobbyError> {
    if id.is_empty() || id.chars().count() > MAX_SESSION_ID_LEN || id.chars().any(char::is_control)
    {
        return Err(LobbyError::InvalidSessionId);
    }
    Ok(())
}
