//! # Tetris Duel Server
//!
//! Server-authoritative, real-time two-player Tetris engine with a
//! lobby and single-elimination tournament brackets.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TETRIS DUEL SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Geometric primitives                      │
//! │  ├── color.rs    - Cell color codes (empty/stone/bomb/ghost) │
//! │  ├── dot.rs      - Single cell with move/rotate transforms   │
//! │  ├── block.rs    - 4-cell tetromino, 6 canonical shapes      │
//! │  └── piece.rs    - Active block + spawn-orientation copy     │
//! │                                                              │
//! │  timer.rs        - Pausable/resettable periodic pulses       │
//! │                                                              │
//! │  game/           - Per-player simulation                     │
//! │  ├── row.rs      - One playfield row                         │
//! │  ├── zone.rs     - Playfield: gravity, clears, bombs, stone  │
//! │  ├── queue.rs    - Upcoming-piece ring                       │
//! │  ├── events.rs   - Typed outbound event stream               │
//! │  └── game.rs     - The game state machine and scoring        │
//! │                                                              │
//! │  table/          - Two-player matches                        │
//! │  ├── table.rs    - Seats, ready flags, match lifecycle       │
//! │  └── dispatcher.rs - Per-match event fan-out loop            │
//! │                                                              │
//! │  hall/           - Table allocation                          │
//! │  ├── registry.rs - Shared id map + expiry sweep              │
//! │  ├── normal.rs   - Free-play hall with rolling id cursor     │
//! │  └── tournament.rs - Single-elimination bracket              │
//! │                                                              │
//! │  protocol.rs     - Boundary messages + collaborator traits   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutable component sits behind its own lock and communicates
//! through bounded channels; producers never block and never hold a
//! lock across a send. One dispatcher task runs per match, one descent
//! driver per game, one pulse loop per timer, one expiry sweep per
//! registry.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod hall;
pub mod protocol;
pub mod table;
pub mod timer;

pub use game::{Game, GameConfig, GameEvent};
pub use hall::{NormalHall, TableRegistry, TournamentHall};
pub use protocol::{ClientCommand, EventSink, Ranking, ServerMessage, TableId, Uid};
pub use table::{run_match, Table, TableConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Playfield columns.
pub const BOARD_WIDTH: usize = 10;

/// Playfield rows.
pub const BOARD_HEIGHT: usize = 20;

/// Upcoming-piece previews per game.
pub const NEXT_PIECES: usize = 5;

/// Automatic descent interval in milliseconds.
pub const DESCENT_INTERVAL_MS: u64 = 1000;

/// Match length in seconds.
pub const MATCH_SECONDS: u32 = 120;

/// KOs dealt that end the opponent's game outright.
pub const KO_LIMIT: u32 = 5;

/// First tournament table id. Ids at or above this are bracket tables;
/// below it, free-play tables. Shared with external collaborators, so
/// the split is bit-exact.
pub const TOURNAMENT_ID_BASE: TableId = 100_000;

/// Whether a table id belongs to the tournament namespace.
pub fn is_tournament_table(id: TableId) -> bool {
    id >= TOURNAMENT_ID_BASE
}
