use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of one client connection. Doubles as the player id on
/// the wire, since a connection owns at most one player at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A member of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    #[serde(rename = "id")]
    pub connection_id: ConnectionId,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "isHost")]
    pub is_host: bool,
}

impl Player {
    pub fn new(connection_id: ConnectionId, display_name: String, is_host: bool) -> Self {
        Self {
            connection_id,
            display_name,
            is_host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_serializes_with_wire_names() {
        let id = ConnectionId::new();
        let player = Player::new(id, "Alice".into(), true);
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["id"], serde_json::json!(id.to_string()));
        assert_eq!(json["name"], "Alice");
        assert_eq!(json["isHost"], true);
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
