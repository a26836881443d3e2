//! The two-player table state machine.
//!
//! A table pairs two seats and an observer set, owns the match lifecycle
//! (ready toggles, start, countdown, reset) and, only while a match
//! runs, exactly two game instances. Seat and lifecycle state sits
//! behind one exclusive lock; the dispatcher reads game handles under
//! the lock but never waits on channels while holding it.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

use crate::game::{Game, GameChannels, GameConfig, GameConfigError};
use crate::protocol::{TableId, Uid};
use crate::timer::{Timer, TimerTicks};

const SIGNAL_BUFFER: usize = 1 << 2;

/// Table lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableStatus {
    /// Seats filling, ready flags togglable.
    Waiting,
    /// A match is in progress.
    Running,
    /// Reclaimable by the owning hall.
    Expired,
}

impl TableStatus {
    fn as_str(self) -> &'static str {
        match self {
            TableStatus::Waiting => "waiting",
            TableStatus::Running => "running",
            TableStatus::Expired => "expired",
        }
    }
}

/// Lifecycle parameters for one table.
#[derive(Clone, Debug)]
pub struct TableConfig {
    /// Match length in seconds.
    pub countdown_secs: u32,
    /// Pre-match countdown broadcast before play begins.
    pub start_countdown: u32,
    /// A running match older than this is reclaimable.
    pub running_expire: Duration,
    /// A waiting table older than this is reclaimable.
    pub waiting_expire: Duration,
    pub game: GameConfig,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            countdown_secs: crate::MATCH_SECONDS,
            start_countdown: 3,
            running_expire: Duration::from_secs(300),
            waiting_expire: Duration::from_secs(3600),
            game: GameConfig::default(),
        }
    }
}

/// Lobby-visible identity of a table.
#[derive(Clone, Debug)]
pub struct TableInfo {
    pub id: TableId,
    pub title: String,
    pub host: Uid,
    pub bet: u64,
}

/// Table operation failure; always recoverable by the caller.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("table {0} is full")]
    Full(TableId),

    #[error("uid {0} already holds a seat at this table")]
    AlreadySeated(Uid),

    #[error("uid {0} is not at this table")]
    UnknownPlayer(Uid),

    #[error("a match is already running")]
    MatchRunning,

    #[error("starting a match requires two seated players")]
    NotEnoughPlayers,

    #[error("no match is running")]
    NoMatch,

    #[error(transparent)]
    GameConfig(#[from] GameConfigError),
}

/// Out-of-band match control raised outside the dispatcher loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchSignal {
    /// A seated player quit mid-match; the index is the vacated seat.
    SeatQuit(usize),
}

/// Everything the dispatcher needs to run one match.
pub struct MatchStart {
    /// Seated uids at start, in seat order. Kept here because a quitting
    /// player vacates the seat before the match concludes.
    pub players: [Uid; 2],
    pub games: [Arc<Game>; 2],
    pub channels: [GameChannels; 2],
    /// One-second match countdown ticks.
    pub countdown: TimerTicks,
    pub signals: mpsc::Receiver<MatchSignal>,
}

#[derive(Clone, Debug)]
struct PlayerSlot {
    uid: Uid,
    nickname: String,
    ready: bool,
}

struct TableCore {
    seats: [Option<PlayerSlot>; 2],
    observers: BTreeSet<Uid>,
    status: TableStatus,
    /// Creation time while waiting, match start time while running.
    since: Instant,
    games: Option<[Arc<Game>; 2]>,
    countdown: Option<Timer>,
    signals_tx: Option<mpsc::Sender<MatchSignal>>,
    remaining_secs: u32,
}

/// A lobby table: two seats, observers, and the match it hosts.
pub struct Table {
    info: TableInfo,
    config: TableConfig,
    core: Mutex<TableCore>,
}

impl Table {
    pub fn new(info: TableInfo, config: TableConfig) -> Arc<Table> {
        Arc::new(Table {
            info,
            config,
            core: Mutex::new(TableCore {
                seats: [None, None],
                observers: BTreeSet::new(),
                status: TableStatus::Waiting,
                since: Instant::now(),
                games: None,
                countdown: None,
                signals_tx: None,
                remaining_secs: 0,
            }),
        })
    }

    pub fn id(&self) -> TableId {
        self.info.id
    }

    pub fn bet(&self) -> u64 {
        self.info.bet
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn status(&self) -> TableStatus {
        self.core.lock().unwrap().status
    }

    /// Take the first free seat.
    pub fn join(&self, uid: Uid, nickname: &str) -> Result<usize, TableError> {
        let mut core = self.core.lock().unwrap();
        if core.seats.iter().flatten().any(|s| s.uid == uid) {
            return Err(TableError::AlreadySeated(uid));
        }
        let Some(seat) = core.seats.iter().position(Option::is_none) else {
            return Err(TableError::Full(self.info.id));
        };
        core.seats[seat] = Some(PlayerSlot {
            uid,
            nickname: nickname.to_string(),
            ready: false,
        });
        Ok(seat)
    }

    pub fn join_observer(&self, uid: Uid) {
        self.core.lock().unwrap().observers.insert(uid);
    }

    /// Leave a seat or the observer set. Quitting a seat mid-match
    /// raises a [`MatchSignal::SeatQuit`] so the dispatcher can conclude
    /// the match in the opponent's favor.
    pub fn quit(&self, uid: Uid) -> Result<(), TableError> {
        let (signal, tx) = {
            let mut core = self.core.lock().unwrap();
            if core.observers.remove(&uid) {
                return Ok(());
            }
            let Some(seat) = core
                .seats
                .iter()
                .position(|s| s.as_ref().is_some_and(|s| s.uid == uid))
            else {
                return Err(TableError::UnknownPlayer(uid));
            };
            core.seats[seat] = None;
            if core.status == TableStatus::Running {
                (Some(MatchSignal::SeatQuit(seat)), core.signals_tx.clone())
            } else {
                (None, None)
            }
        };
        if let (Some(signal), Some(tx)) = (signal, tx) {
            if tx.try_send(signal).is_err() {
                warn!(table = self.info.id, "quit signal dropped: match already concluding");
            }
        }
        Ok(())
    }

    /// Toggle a seated player's ready flag. Rejected while a match runs.
    pub fn switch_ready(&self, uid: Uid) -> Result<bool, TableError> {
        let mut core = self.core.lock().unwrap();
        if core.status == TableStatus::Running {
            return Err(TableError::MatchRunning);
        }
        let slot = core
            .seats
            .iter_mut()
            .flatten()
            .find(|s| s.uid == uid)
            .ok_or(TableError::UnknownPlayer(uid))?;
        slot.ready = !slot.ready;
        Ok(slot.ready)
    }

    /// Both seats filled and ready.
    pub fn all_ready(&self) -> bool {
        let core = self.core.lock().unwrap();
        core.seats.iter().all(|s| s.as_ref().is_some_and(|s| s.ready))
    }

    pub fn is_full(&self) -> bool {
        self.core.lock().unwrap().seats.iter().all(Option::is_some)
    }

    pub fn seated_count(&self) -> usize {
        self.core.lock().unwrap().seats.iter().flatten().count()
    }

    pub fn seat_of(&self, uid: Uid) -> Option<usize> {
        self.core
            .lock()
            .unwrap()
            .seats
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| s.uid == uid))
    }

    /// Build two fresh games and hand the match to a dispatcher. The
    /// games stay idle until [`Table::begin_play`].
    pub fn start_game(&self) -> Result<MatchStart, TableError> {
        let mut core = self.core.lock().unwrap();
        if core.status == TableStatus::Running {
            return Err(TableError::MatchRunning);
        }
        let players = match (&core.seats[0], &core.seats[1]) {
            (Some(a), Some(b)) => [a.uid, b.uid],
            _ => return Err(TableError::NotEnoughPlayers),
        };

        let (game1, channels1) = Game::new(&self.config.game)?;
        let (game2, channels2) = Game::new(&self.config.game)?;
        let (countdown, ticks) = Timer::new(1000);
        let (signals_tx, signals) = mpsc::channel(SIGNAL_BUFFER);

        core.status = TableStatus::Running;
        core.since = Instant::now();
        core.remaining_secs = self.config.countdown_secs;
        core.games = Some([Arc::clone(&game1), Arc::clone(&game2)]);
        core.countdown = Some(countdown);
        core.signals_tx = Some(signals_tx);

        Ok(MatchStart {
            players,
            games: [game1, game2],
            channels: [channels1, channels2],
            countdown: ticks,
            signals,
        })
    }

    /// Start the countdown and both games. Called by the dispatcher once
    /// the pre-match countdown has been broadcast.
    pub fn begin_play(&self) -> Result<(), TableError> {
        let core = self.core.lock().unwrap();
        let games = core.games.as_ref().ok_or(TableError::NoMatch)?;
        if let Some(countdown) = &core.countdown {
            countdown.start();
        }
        for game in games {
            game.start();
        }
        Ok(())
    }

    /// One second elapsed on the match clock; returns seconds remaining.
    pub fn tick_countdown(&self) -> u32 {
        let mut core = self.core.lock().unwrap();
        core.remaining_secs = core.remaining_secs.saturating_sub(1);
        core.remaining_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.core.lock().unwrap().remaining_secs
    }

    /// Pause both games and the countdown without tearing down.
    pub fn stop_game(&self) {
        let core = self.core.lock().unwrap();
        if let Some(countdown) = &core.countdown {
            countdown.pause();
        }
        if let Some(games) = &core.games {
            for game in games {
                game.stop();
            }
        }
    }

    /// Tear down the match and return to `Waiting` with ready flags
    /// cleared. Dropping the games and countdown aborts their tasks.
    pub fn reset(&self) {
        let mut core = self.core.lock().unwrap();
        core.games = None;
        core.countdown = None;
        core.signals_tx = None;
        core.remaining_secs = 0;
        if core.status == TableStatus::Running {
            core.status = TableStatus::Waiting;
        }
        core.since = Instant::now();
        for slot in core.seats.iter_mut().flatten() {
            slot.ready = false;
        }
    }

    /// Reclaimable: running too long, or idle too long.
    pub fn is_expired(&self, now: Instant) -> bool {
        let core = self.core.lock().unwrap();
        let age = now.saturating_duration_since(core.since);
        match core.status {
            TableStatus::Running => age > self.config.running_expire,
            TableStatus::Waiting => age > self.config.waiting_expire,
            TableStatus::Expired => true,
        }
    }

    /// Mark reclaimable; terminal.
    pub fn expire(&self) {
        self.core.lock().unwrap().status = TableStatus::Expired;
    }

    /// Read-only snapshot for the lobby listing API.
    pub fn wrap(&self) -> TableSnapshot {
        let core = self.core.lock().unwrap();
        TableSnapshot {
            id: self.info.id,
            title: self.info.title.clone(),
            host: self.info.host,
            bet: self.info.bet,
            status: core.status.as_str(),
            seats: core
                .seats
                .iter()
                .map(|slot| {
                    slot.as_ref().map(|s| SeatSnapshot {
                        uid: s.uid,
                        nickname: s.nickname.clone(),
                        ready: s.ready,
                    })
                })
                .collect(),
            observers: core.observers.iter().copied().collect(),
            remaining_secs: core.remaining_secs,
        }
    }
}

/// One seat in a [`TableSnapshot`].
#[derive(Clone, Debug, Serialize)]
pub struct SeatSnapshot {
    pub uid: Uid,
    pub nickname: String,
    pub ready: bool,
}

/// Lobby listing entry.
#[derive(Clone, Debug, Serialize)]
pub struct TableSnapshot {
    pub id: TableId,
    pub title: String,
    pub host: Uid,
    pub bet: u64,
    pub status: &'static str,
    pub seats: Vec<Option<SeatSnapshot>>,
    pub observers: Vec<Uid>,
    pub remaining_secs: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Arc<Table> {
        Table::new(
            TableInfo { id: 1, title: "test".into(), host: 10, bet: 0 },
            TableConfig::default(),
        )
    }

    #[test]
    fn test_join_fills_seats_in_order() {
        let t = table();
        assert_eq!(t.join(10, "alice").unwrap(), 0);
        assert_eq!(t.join(11, "bob").unwrap(), 1);
        assert!(matches!(t.join(12, "carol"), Err(TableError::Full(1))));
        assert!(matches!(t.join(10, "alice"), Err(TableError::AlreadySeated(10))));
        assert!(t.is_full());
    }

    #[test]
    fn test_quit_vacates_seat_for_next_joiner() {
        let t = table();
        t.join(10, "alice").unwrap();
        t.join(11, "bob").unwrap();
        t.quit(10).unwrap();
        assert_eq!(t.seated_count(), 1);
        assert_eq!(t.join(12, "carol").unwrap(), 0);
    }

    #[test]
    fn test_observers_come_and_go() {
        let t = table();
        t.join_observer(77);
        assert_eq!(t.wrap().observers, vec![77]);
        t.quit(77).unwrap();
        assert!(t.wrap().observers.is_empty());
        assert!(matches!(t.quit(77), Err(TableError::UnknownPlayer(77))));
    }

    #[test]
    fn test_switch_ready_toggles() {
        let t = table();
        t.join(10, "alice").unwrap();
        t.join(11, "bob").unwrap();
        assert!(t.switch_ready(10).unwrap());
        assert!(!t.all_ready());
        assert!(t.switch_ready(11).unwrap());
        assert!(t.all_ready());
        assert!(!t.switch_ready(10).unwrap());
    }

    #[tokio::test]
    async fn test_start_requires_two_players() {
        let t = table();
        t.join(10, "alice").unwrap();
        assert!(matches!(t.start_game(), Err(TableError::NotEnoughPlayers)));
    }

    #[tokio::test]
    async fn test_start_rejects_double_start_and_ready() {
        let t = table();
        t.join(10, "alice").unwrap();
        t.join(11, "bob").unwrap();
        let start = t.start_game().unwrap();
        assert_eq!(start.players, [10, 11]);
        assert_eq!(t.status(), TableStatus::Running);
        assert!(matches!(t.start_game(), Err(TableError::MatchRunning)));
        assert!(matches!(t.switch_ready(10), Err(TableError::MatchRunning)));
    }

    #[tokio::test]
    async fn test_quit_mid_match_signals_dispatcher() {
        let t = table();
        t.join(10, "alice").unwrap();
        t.join(11, "bob").unwrap();
        let mut start = t.start_game().unwrap();
        t.quit(11).unwrap();
        assert_eq!(start.signals.try_recv().unwrap(), MatchSignal::SeatQuit(1));
    }

    #[tokio::test]
    async fn test_reset_returns_to_waiting_and_clears_ready() {
        let t = table();
        t.join(10, "alice").unwrap();
        t.join(11, "bob").unwrap();
        t.switch_ready(10).unwrap();
        t.switch_ready(11).unwrap();
        let _start = t.start_game().unwrap();
        t.reset();
        assert_eq!(t.status(), TableStatus::Waiting);
        assert!(!t.all_ready());
        assert_eq!(t.remaining_secs(), 0);
    }

    #[tokio::test]
    async fn test_countdown_ticks_down_to_zero() {
        let t = table();
        t.join(10, "alice").unwrap();
        t.join(11, "bob").unwrap();
        let _start = t.start_game().unwrap();
        let initial = t.remaining_secs();
        assert_eq!(t.tick_countdown(), initial - 1);
    }

    #[test]
    fn test_expiry_thresholds() {
        let t = Table::new(
            TableInfo { id: 1, title: "t".into(), host: 1, bet: 0 },
            TableConfig {
                waiting_expire: Duration::from_secs(0),
                ..TableConfig::default()
            },
        );
        // waiting_expire of zero makes the fresh table instantly stale.
        std::thread::sleep(Duration::from_millis(5));
        assert!(t.is_expired(Instant::now()));

        let t = table();
        assert!(!t.is_expired(Instant::now()));
        t.expire();
        assert!(t.is_expired(Instant::now()));
        assert_eq!(t.status(), TableStatus::Expired);
    }
}
