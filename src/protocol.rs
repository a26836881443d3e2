//! Boundary message types and collaborator traits.
//!
//! Transport framing, sessions and persistence live outside this crate;
//! what crosses the boundary is typed commands in, typed messages out,
//! plus two collaborator traits the dispatcher calls at match end and
//! during fan-out. Implementations are injected, never global.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::GameEvent;

/// Player identity, assigned by the external account system.
pub type Uid = u64;

/// Table identifier. Ids at or above [`crate::TOURNAMENT_ID_BASE`] are
/// tournament-bracket tables; below that, free-play tables. Other
/// collaborators share this id space, so the split is bit-exact.
pub type TableId = u32;

/// A piece-control input for one seat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    MoveLeft,
    MoveRight,
    MoveDown,
    Drop,
    Rotate,
    Hold,
}

/// A command from an authenticated session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Drive the sender's active piece.
    Play {
        table_id: TableId,
        uid: Uid,
        action: PlayerAction,
    },
    /// Toggle the sender's ready flag.
    SwitchReady { table_id: TableId, uid: Uid },
    /// Leave a seat or the observer set.
    Quit { table_id: TableId, uid: Uid },
}

/// An outbound message, already scoped to its audience by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// An event from one seat's game. Seats are numbered 1 and 2.
    Game { seat: u8, event: GameEvent },
    /// Match countdown: seconds remaining.
    Timer { secs: u32 },
    /// Pre-match countdown: 3, 2, 1.
    Start { count: u32 },
    /// Final match outcome.
    Result {
        table_id: TableId,
        winner: Uid,
        loser: Uid,
    },
}

/// Who receives a message. Seat values are internal indices (0 or 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    /// The seated player only.
    Player(usize),
    /// The seated player plus every observer.
    PlayerAndObservers(usize),
    /// Both players and every observer.
    All,
}

/// Fan-out target for match messages. The session layer implements this
/// over its connection registry; delivery failures are its concern.
pub trait EventSink: Send + Sync {
    fn deliver(&self, audience: Audience, message: ServerMessage);
}

/// Ranking/settlement backend failure.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("ranking backend rejected the result: {0}")]
    Rejected(String),
    #[error("ranking backend unavailable: {0}")]
    Unavailable(String),
}

/// Match-result collaborator, invoked exactly once per concluded match.
/// Failures are logged by the caller, never retried.
pub trait Ranking: Send + Sync {
    /// Settle a free-play match.
    fn normal_result(
        &self,
        table_id: TableId,
        winner: Uid,
        loser: Uid,
        bet: u64,
    ) -> Result<(), RankingError>;

    /// Record a bracket match; returns the winner's next table id.
    fn tournament_result(
        &self,
        table_id: TableId,
        winner: Uid,
        loser: Uid,
    ) -> Result<TableId, RankingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_round_trip() {
        let cmd = ClientCommand::Play {
            table_id: 7,
            uid: 42,
            action: PlayerAction::Rotate,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(
            json,
            r#"{"type":"play","table_id":7,"uid":42,"action":"rotate"}"#
        );
        let back: ClientCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn test_messages_tag_their_kind() {
        let msg = ServerMessage::Timer { secs: 30 };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"timer","secs":30}"#
        );
        let msg = ServerMessage::Result { table_id: 100_001, winner: 1, loser: 2 };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"result","table_id":100001,"winner":1,"loser":2}"#
        );
    }
}
