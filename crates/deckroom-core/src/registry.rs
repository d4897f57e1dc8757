use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::LobbyError;
use crate::net::messages::{
    GameCreatedMsg, GameStartedMsg, JoinedGameMsg, PlayerJoinedMsg, PlayerLeftMsg, ServerEvent,
};
use crate::player::{ConnectionId, Player};
use crate::session::{Session, SessionId};

/// One outbound notification and the connections it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub recipients: Vec<ConnectionId>,
    pub event: ServerEvent,
}

impl Dispatch {
    pub fn to(recipient: ConnectionId, event: ServerEvent) -> Self {
        Self {
            recipients: vec![recipient],
            event,
        }
    }

    pub fn to_many(recipients: Vec<ConnectionId>, event: ServerEvent) -> Self {
        Self { recipients, event }
    }
}

/// Notifications produced by a successful operation, in delivery order.
pub type Outbox = Vec<Dispatch>;

/// Sole owner of all session and player state.
///
/// Every operation runs to completion without I/O, so callers serialize
/// access by holding one exclusive lock (or task) around the registry.
/// Failed operations leave the registry untouched.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    /// Which session each connection is bound to.
    bindings: HashMap<ConnectionId, SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with the requester as its only player and host.
    pub fn create_session(
        &mut self,
        session_id: SessionId,
        connection_id: ConnectionId,
        display_name: String,
    ) -> Result<Outbox, LobbyError> {
        if self.bindings.contains_key(&connection_id) {
            return Err(LobbyError::AlreadyInSession);
        }
        if self.sessions.contains_key(&session_id) {
            return Err(LobbyError::SessionExists);
        }

        tracing::info!(
            session = %session_id,
            connection = %connection_id,
            player = %display_name,
            "Session created"
        );

        let host = Player::new(connection_id, display_name, true);
        let session = Session::new(session_id.clone(), host, Instant::now());
        self.sessions.insert(session_id.clone(), session);
        self.bindings.insert(connection_id, session_id.clone());

        Ok(vec![Dispatch::to(
            connection_id,
            ServerEvent::GameCreated(GameCreatedMsg {
                game_id: session_id,
                player_id: connection_id,
            }),
        )])
    }

    /// Add a non-host player to an existing session.
    ///
    /// Checks run in a fixed order so the reported error is deterministic:
    /// binding, existence, capacity, name.
    pub fn join_session(
        &mut self,
        session_id: &str,
        connection_id: ConnectionId,
        display_name: String,
    ) -> Result<Outbox, LobbyError> {
        if self.bindings.contains_key(&connection_id) {
            return Err(LobbyError::AlreadyInSession);
        }
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or(LobbyError::SessionNotFound)?;
        if session.is_full() {
            return Err(LobbyError::SessionFull);
        }
        if session.has_name(&display_name) {
            return Err(LobbyError::NameTaken);
        }

        tracing::info!(
            session = session_id,
            connection = %connection_id,
            player = %display_name,
            players = session.players.len() + 1,
            "Player joined"
        );

        let others = session.members();
        session
            .players
            .push(Player::new(connection_id, display_name.clone(), false));
        session.last_activity = Instant::now();
        self.bindings.insert(connection_id, session.id.clone());

        let roster = session.players.clone();
        Ok(vec![
            Dispatch::to(
                connection_id,
                ServerEvent::JoinedGame(JoinedGameMsg {
                    game_id: session.id.clone(),
                    player_id: connection_id,
                    players: roster.clone(),
                }),
            ),
            Dispatch::to_many(
                others,
                ServerEvent::PlayerJoined(PlayerJoinedMsg {
                    player_name: display_name,
                    player_id: connection_id,
                    players: roster,
                }),
            ),
        ])
    }

    /// Broadcast a start signal. Unknown sessions are ignored; only the host
    /// may start. Membership is left unchanged and repeated starts re-broadcast.
    pub fn start_session(
        &mut self,
        session_id: &str,
        connection_id: ConnectionId,
    ) -> Result<Outbox, LobbyError> {
        let Some(session) = self.sessions.get_mut(session_id) else {
            tracing::debug!(session = session_id, "Start ignored for unknown session");
            return Ok(Vec::new());
        };
        if session.host != connection_id {
            return Err(LobbyError::NotHost);
        }

        session.last_activity = Instant::now();
        tracing::info!(session = session_id, host = %connection_id, "Game started");

        Ok(vec![Dispatch::to_many(
            session.members(),
            ServerEvent::GameStarted(GameStartedMsg {
                started_by: connection_id,
                players: session.players.clone(),
            }),
        )])
    }

    /// Remove a connection from whatever session it is bound to. Transfers
    /// host authority to the earliest remaining player and deletes the
    /// session once empty. A no-op for unbound connections.
    pub fn handle_disconnect(&mut self, connection_id: ConnectionId) -> Outbox {
        let Some(session_id) = self.bindings.remove(&connection_id) else {
            return Vec::new();
        };
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return Vec::new();
        };
        let Some(departed) = session.remove_player(connection_id) else {
            return Vec::new();
        };

        if session.players.is_empty() {
            self.sessions.remove(&session_id);
            tracing::info!(session = %session_id, "Session deleted (last player left)");
            return Vec::new();
        }

        if session.host == connection_id {
            session.promote_first();
            tracing::info!(
                session = %session_id,
                new_host = %session.host,
                "Host migrated"
            );
        }

        tracing::info!(
            session = %session_id,
            connection = %connection_id,
            player = %departed.display_name,
            players = session.players.len(),
            "Player left"
        );

        vec![Dispatch::to_many(
            session.members(),
            ServerEvent::PlayerLeft(PlayerLeftMsg {
                player_id: connection_id,
                player_name: departed.display_name,
                players: session.players.clone(),
            }),
        )]
    }

    /// Delete every session idle for longer than `idle_threshold` as of
    /// `now`. Members are not notified. Returns the removed ids, sorted.
    pub fn sweep_inactive(&mut self, now: Instant, idle_threshold: Duration) -> Vec<SessionId> {
        let mut removed: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| now.saturating_duration_since(s.last_activity) > idle_threshold)
            .map(|s| s.id.clone())
            .collect();
        removed.sort();

        for id in &removed {
            if let Some(session) = self.sessions.remove(id) {
                for p in &session.players {
                    self.bindings.remove(&p.connection_id);
                }
            }
        }
        removed
    }

    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// The session a connection is currently bound to.
    pub fn session_of(&self, connection_id: ConnectionId) -> Option<&SessionId> {
        self.bindings.get(&connection_id)
    }

    /// Number of live sessions.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Returns (session_count, total_player_count).
    pub fn stats(&self) -> (usize, usize) {
        let players = self.sessions.values().map(|s| s.players.len()).sum();
        (self.sessions.len(), players)
    }

    /// Panics if any membership invariant is violated.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn assert_invariants(&self) {
        use crate::session::MAX_PLAYERS;

        for (id, session) in &self.sessions {
            assert_eq!(&session.id, id, "session keyed under the wrong id");
            let n = session.players.len();
            assert!(
                (1..=MAX_PLAYERS).contains(&n),
                "session {id} has {n} players"
            );
            let hosts: Vec<&Player> = session.players.iter().filter(|p| p.is_host).collect();
            assert_eq!(hosts.len(), 1, "session {id} must have exactly one host");
            assert_eq!(hosts[0].connection_id, session.host);
            for (i, p) in session.players.iter().enumerate() {
                assert!(
                    session.players[i + 1..]
                        .iter()
                        .all(|q| q.display_name != p.display_name),
                    "duplicate name {} in session {id}",
                    p.display_name
                );
                assert_eq!(
                    self.bindings.get(&p.connection_id),
                    Some(id),
                    "player not bound to its session"
                );
            }
        }
        let bound_players: usize = self.sessions.values().map(|s| s.players.len()).sum();
        assert_eq!(
            self.bindings.len(),
            bound_players,
            "stale connection bindings"
        );
    }
}
