use thiserror::Error;

use crate::session::{MAX_NAME_LEN, MAX_PLAYERS, MAX_SESSION_ID_LEN};

/// Client-input errors raised by session operations. Reported to the
/// requesting connection only; none of them is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LobbyError {
    #[error("Game not found")]
    SessionNotFound,
    #[error("Game is full (max {MAX_PLAYERS} players)")]
    SessionFull,
    #[error("Name already taken")]
    NameTaken,
    #[error("Only the host can start the game")]
    NotHost,
    #[error("Game already exists")]
    SessionExists,
    #[error("Already in a game")]
    AlreadyInSession,
    #[error("Player name must be 1-{MAX_NAME_LEN} characters without control characters")]
    InvalidName,
    #[error("Game id must be 1-{MAX_SESSION_ID_LEN} characters without control characters")]
    InvalidSessionId,
}
