//! Typed events emitted by a running game.
//!
//! Events are the game's entire public output: the dispatcher pulls them
//! from a bounded channel and fans them out to players and observers
//! according to their kind. Payloads are already rendered (color-code
//! grids), so consumers never reach into game internals.

use serde::{Deserialize, Serialize};

use crate::core::block::PieceGrid;

/// A rendered playfield: `height` rows of `width` color codes.
pub type ZoneGrid = Vec<Vec<i8>>;

/// Sound cues, resolved to client-side effect files by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cue", rename_all = "snake_case")]
pub enum AudioCue {
    /// Background music toggle (start and pause).
    Background,
    /// A bomb chain went off.
    Bomb,
    /// Scored a KO on the opponent.
    Ko,
    /// Combo attack of `lines` bonus lines.
    Combo { lines: u32 },
}

impl AudioCue {
    /// Client-side effect file for this cue.
    pub fn file_name(&self) -> String {
        match self {
            AudioCue::Background => "background.avi".to_string(),
            AudioCue::Bomb => "bomb.avi".to_string(),
            AudioCue::Ko => "ko.avi".to_string(),
            AudioCue::Combo { lines } => format!("combo{lines}.avi"),
        }
    }
}

/// One event on a game's outbound stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// The upcoming-piece previews changed.
    Next { pieces: Vec<PieceGrid> },
    /// The held piece changed.
    HoldPiece { piece: PieceGrid },
    /// Full playfield render: committed cells, ghost preview, active block.
    Zone { cells: ZoneGrid },
    /// Play a sound effect.
    Audio { cue: AudioCue },
    /// Lines sent to the opponent by one lock.
    Attack { lines: u32 },
    /// Cumulative lines-sent counter changed.
    LinesSent { total: u32 },
    /// Combo streak length changed.
    Combo { streak: u32 },
    /// This player KO'd the opponent; `count` KOs dealt so far.
    Ko { count: u32 },
    /// This player was KO'd; `count` is the opponent's KO tally.
    BeingKo { count: u32 },
    /// The game was paused.
    Pause,
    /// Terminal: the game is over.
    GameOver,
    /// The whole zone is empty after a clear.
    Clear,
}
