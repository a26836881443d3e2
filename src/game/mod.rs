//! Per-player simulation: the playfield, the piece pipeline and the
//! event-emitting game state machine.

pub mod events;
pub mod game;
pub mod queue;
pub mod row;
pub mod zone;

pub use events::{AudioCue, GameEvent, ZoneGrid};
pub use game::{Game, GameChannels, GameConfig, GameConfigError, GamePhase};
pub use queue::PieceQueue;
pub use row::Row;
pub use zone::Zone;
