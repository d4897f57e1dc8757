//! Session membership state machine and wire protocol for the Deckroom lobby.
//!
//! [`registry::SessionRegistry`] owns every session; the `net` module maps
//! its inputs and notifications onto JSON and MessagePack frames.

pub mod error;
pub mod net;
pub mod player;
pub mod registry;
pub mod session;

pub use error::LobbyError;
pub use player::{ConnectionId, Player};
pub use registry::{Dispatch, Outbox, SessionRegistry};
pub use session::{MAX_PLAYERS, Session, SessionId};
