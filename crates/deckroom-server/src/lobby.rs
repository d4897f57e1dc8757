use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use deckroom_core::net::messages::{ClientEvent, ServerEvent};
use deckroom_core::session::{validate_player_name, validate_session_id};
use deckroom_core::{ConnectionId, LobbyError, Outbox, SessionId, SessionRegistry};

/// Per-connection sender for outbound notifications. Bounded so a slow
/// client cannot exhaust memory; the writer task encodes each event with the
/// connection's current codec.
pub type ConnectionSender = mpsc::Sender<ServerEvent>;

/// The session registry plus the outbound channel of every live connection.
///
/// Notifications are pushed with `try_send` while the caller still holds the
/// lobby lock, so every connection observes events in registry order.
#[derive(Default)]
pub struct Lobby {
    registry: SessionRegistry,
    connections: HashMap<ConnectionId, ConnectionSender>,
}

impl Lobby {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted connection.
    pub fn connect(&mut self, connection_id: ConnectionId, sender: ConnectionSender) {
        self.connections.insert(connection_id, sender);
    }

    /// Route one inbound event to the registry and deliver the outcome.
    /// Failures are reported to the requester only.
    pub fn handle_event(&mut self, connection_id: ConnectionId, event: ClientEvent) {
        let result = match event {
            ClientEvent::CreateGame(msg) => validate_session_id(&msg.game_id)
                .and_then(|()| validate_player_name(&msg.player_name))
                .and_then(|name| {
                    self.registry
                        .create_session(msg.game_id, connection_id, name)
                }),
            ClientEvent::JoinGame(msg) => validate_session_id(&msg.game_id)
                .and_then(|()| validate_player_name(&msg.player_name))
                .and_then(|name| {
                    self.registry
                        .join_session(&msg.game_id, connection_id, name)
                }),
            ClientEvent::StartGame(msg) => self.registry.start_session(&msg.game_id, connection_id),
            ClientEvent::LeaveGame => Ok(self.registry.handle_disconnect(connection_id)),
        };

        match result {
            Ok(outbox) => self.deliver(outbox),
            Err(err) => self.reject(connection_id, err),
        }
    }

    /// Drop a closed connection: leave its session and forget its sender.
    pub fn disconnect(&mut self, connection_id: ConnectionId) {
        let outbox = self.registry.handle_disconnect(connection_id);
        self.connections.remove(&connection_id);
        self.deliver(outbox);
    }

    /// Reclaim idle sessions. Members stay connected but are unbound.
    pub fn sweep(&mut self, now: Instant, idle_threshold: Duration) -> Vec<SessionId> {
        self.registry.sweep_inactive(now, idle_threshold)
    }

    /// Send one event to one connection, dropping it if the client is slow.
    pub fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.connections.get(&connection_id)
            && let Err(e) = sender.try_send(event)
        {
            tracing::debug!(
                connection = %connection_id, error = %e,
                "Failed to send to connection (slow or disconnected)"
            );
        }
    }

    fn deliver(&self, outbox: Outbox) {
        for dispatch in outbox {
            for &recipient in &dispatch.recipients {
                self.send_to(recipient, dispatch.event.clone());
            }
        }
    }

    fn reject(&self, connection_id: ConnectionId, err: LobbyError) {
        tracing::debug!(connection = %connection_id, error = %err, "Request rejected");
        self.send_to(connection_id, ServerEvent::from(err));
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
