//! Halls: the shared table registry, free-play allocation and the
//! tournament bracket.

use thiserror::Error;

use crate::protocol::{TableId, Uid};
use crate::table::TableError;

pub mod normal;
pub mod registry;
pub mod tournament;

pub use normal::NormalHall;
pub use registry::{SweepConfig, TableRegistry};
pub use tournament::{TournamentHall, TournamentSnapshot, TournamentStatus};

/// Hall operation failure; always recoverable by the caller.
#[derive(Debug, Error)]
pub enum HallError {
    #[error("table id {0} is already registered")]
    IdCollision(TableId),

    #[error("table {0} not found")]
    TableNotFound(TableId),

    #[error("free-play id space exhausted")]
    IdSpaceExhausted,

    #[error("tournament capacity must be a power of two of at least 2, got {0}")]
    InvalidCapacity(u32),

    #[error("tournament enrollment is full ({0} candidates)")]
    EnrollmentFull(u32),

    #[error("operation not valid while the tournament is {0}")]
    WrongStatus(&'static str),

    #[error("the current round's bracket is not fully seated")]
    BracketNotReady,

    #[error("uid {0} does not hold a seat at that table")]
    PlayerNotSeated(Uid),

    #[error(transparent)]
    Table(#[from] TableError),
}
