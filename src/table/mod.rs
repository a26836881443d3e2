//! Two-player tables: the seat/lifecycle state machine and the per-match
//! event dispatcher.

pub mod dispatcher;
pub mod table;

pub use dispatcher::run_match;
pub use table::{
    MatchSignal, MatchStart, SeatSnapshot, Table, TableConfig, TableError, TableInfo,
    TableSnapshot, TableStatus,
};
