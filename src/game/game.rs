//! The per-player game state machine.
//!
//! A game owns one zone, the active/held/upcoming piece pipeline, the
//! score counters and a private descent timer. All mutable state sits
//! behind one exclusive lock; every public mutator collects its outbound
//! messages under the lock and sends them only after release, so the
//! lock is never held across a channel operation. Producers use
//! `try_send` against bounded channels: a lagging consumer drops events
//! rather than stalling the simulation.

use std::sync::{Arc, Mutex, Weak};

use rand::Rng;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

use crate::core::Piece;
use crate::game::events::{AudioCue, GameEvent};
use crate::game::queue::PieceQueue;
use crate::game::zone::Zone;
use crate::timer::{Timer, TimerTicks};

const EVENT_BUFFER: usize = 1 << 10;
const ATTACK_BUFFER: usize = 1 << 6;
const SIGNAL_BUFFER: usize = 1 << 3;

/// Board and pacing parameters for one game.
#[derive(Clone, Debug)]
pub struct GameConfig {
    pub width: usize,
    pub height: usize,
    /// Upcoming-piece previews kept in the ring.
    pub next_pieces: usize,
    /// Automatic descent interval in milliseconds.
    pub descent_interval_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: crate::BOARD_WIDTH,
            height: crate::BOARD_HEIGHT,
            next_pieces: crate::NEXT_PIECES,
            descent_interval_ms: crate::DESCENT_INTERVAL_MS,
        }
    }
}

/// Invalid game configuration.
#[derive(Debug, Clone, Error)]
pub enum GameConfigError {
    #[error("board width must be at least {min}")]
    WidthTooSmall { min: usize },

    #[error("board height must be at least {min}")]
    HeightTooSmall { min: usize },

    #[error("at least one upcoming piece is required")]
    NoUpcomingPieces,
}

impl GameConfig {
    fn validate(&self) -> Result<(), GameConfigError> {
        let min = crate::core::BLOCK_DOTS;
        if self.width < min {
            return Err(GameConfigError::WidthTooSmall { min });
        }
        if self.height < min {
            return Err(GameConfigError::HeightTooSmall { min });
        }
        if self.next_pieces == 0 {
            return Err(GameConfigError::NoUpcomingPieces);
        }
        Ok(())
    }
}

/// Game lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GamePhase {
    /// Constructed, timer paused.
    Idle,
    /// Simulation running.
    Running,
    /// Suspended, resumable.
    Paused,
    /// Terminal.
    Over,
}

/// Receiver halves of a game's outbound channels, handed to the match
/// dispatcher at creation.
pub struct GameChannels {
    /// Render/score/audio event stream.
    pub events: mpsc::Receiver<GameEvent>,
    /// Lines to deliver to the opposing game.
    pub attacks: mpsc::Receiver<u32>,
    /// This game was KO'd (topped out or got unabsorbable garbage).
    pub being_ko: mpsc::Receiver<()>,
    /// Terminal transition fired.
    pub game_over: mpsc::Receiver<()>,
}

/// Messages collected under the game lock, flushed after release.
#[derive(Default)]
struct Outbox {
    events: Vec<GameEvent>,
    attack: Option<u32>,
    being_ko: bool,
    reset_timer: bool,
}

struct GameCore {
    zone: Zone,
    active: Piece,
    held: Option<Piece>,
    held_this_piece: bool,
    queue: PieceQueue,
    lines_sent: u32,
    combo: u32,
    kos: u32,
    phase: GamePhase,
}

impl GameCore {
    fn new(config: &GameConfig, rng: &mut impl Rng) -> GameCore {
        let spawn_col = (config.width / 2) as i8 - 2;
        let queue = PieceQueue::new(
            (0..config.next_pieces)
                .map(|_| Piece::random(rng, spawn_col))
                .collect(),
        );
        GameCore {
            zone: Zone::new(config.height, config.width),
            active: Piece::random(rng, spawn_col),
            held: None,
            held_this_piece: false,
            queue,
            lines_sent: 0,
            combo: 0,
            kos: 0,
            phase: GamePhase::Idle,
        }
    }

    fn spawn_col(&self) -> i8 {
        (self.zone.width() / 2) as i8 - 2
    }

    /// One simulation pass: optional descent or hard drop, then lock
    /// handling, KO detection and re-render.
    fn advance(&mut self, move_down: bool, drop: bool, rng: &mut impl Rng, out: &mut Outbox) {
        let mut lock_piece = false;
        if move_down {
            if self.zone.can_descend(&self.active.block) {
                self.active.block = self.active.block.down();
            } else {
                lock_piece = true;
            }
        } else if drop {
            self.active.block = self.zone.dropped(self.active.block);
            lock_piece = true;
        }

        if lock_piece {
            self.held_this_piece = false;
            self.zone.lock(&self.active.block);
            let sent = self.settle_lock(out);
            if sent > 0 {
                self.lines_sent += sent;
                out.attack = Some(sent);
                out.events.push(GameEvent::Attack { lines: sent });
                out.events.push(GameEvent::LinesSent { total: self.lines_sent });
            }
            let refill = Piece::random(rng, self.spawn_col());
            self.active = self.queue.exchange(refill);
            out.events.push(GameEvent::Next { pieces: self.queue.grids() });
        }

        if move_down || drop {
            out.reset_timer = true;
        }

        if self.zone.is_ko() {
            out.being_ko = true;
            self.zone.remove_stone_lines();
        }

        // A blocked spawn position means the board is topped out; the KO
        // above already covered it, so emit nothing further this pass.
        if self.zone.can_place(&self.active.block) {
            out.events.push(GameEvent::Zone {
                cells: self.zone.render(&self.active.block),
            });
        }
    }

    /// Score one lock: bomb chains, cleared rows, clear-zone bonus and
    /// the combo streak. Returns the lines to send to the opponent.
    fn settle_lock(&mut self, out: &mut Outbox) -> u32 {
        let bombs = self.zone.check_hit_bombs(&self.active.block) as u32;
        if bombs > 0 {
            out.events.push(GameEvent::Audio { cue: AudioCue::Bomb });
        }
        let mut lines = self.zone.clear_lines() as u32;

        let mut sent = 0;
        if self.zone.is_clear() {
            sent += 10;
            out.events.push(GameEvent::Clear);
        }

        // A lock worth one row or less breaks the streak and sends nothing.
        if lines + bombs + sent <= 1 {
            self.combo = 0;
            return sent;
        }

        self.combo += 1;
        let bonus = combo_bonus(self.combo);
        if bonus > 0 {
            sent += bonus;
            out.events.push(GameEvent::Combo { streak: self.combo });
            out.events.push(GameEvent::Audio {
                cue: AudioCue::Combo { lines: bonus },
            });
        }

        // Partial clears lose one row of credit; a 4-row clear is worth
        // full value.
        if (1..4).contains(&lines) {
            lines -= 1;
        }

        sent + lines + bombs
    }
}

/// Combo streak to bonus attack lines.
fn combo_bonus(streak: u32) -> u32 {
    match streak {
        0 | 1 => 0,
        2 | 3 => 1,
        4 | 5 => 2,
        6 | 7 => 3,
        _ => 4,
    }
}

/// A single player's running simulation.
pub struct Game {
    core: Mutex<GameCore>,
    timer: Timer,
    events_tx: mpsc::Sender<GameEvent>,
    attacks_tx: mpsc::Sender<u32>,
    being_ko_tx: mpsc::Sender<()>,
    game_over_tx: mpsc::Sender<()>,
}

impl Game {
    /// Create a game and its outbound channel halves. The descent driver
    /// task is spawned immediately but stays silent until [`Game::start`].
    pub fn new(config: &GameConfig) -> Result<(Arc<Game>, GameChannels), GameConfigError> {
        config.validate()?;
        let core = GameCore::new(config, &mut rand::thread_rng());
        let (timer, ticks) = Timer::new(config.descent_interval_ms);
        let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
        let (attacks_tx, attacks) = mpsc::channel(ATTACK_BUFFER);
        let (being_ko_tx, being_ko) = mpsc::channel(SIGNAL_BUFFER);
        let (game_over_tx, game_over) = mpsc::channel(SIGNAL_BUFFER);

        let game = Arc::new(Game {
            core: Mutex::new(core),
            timer,
            events_tx,
            attacks_tx,
            being_ko_tx,
            game_over_tx,
        });
        spawn_descent_driver(Arc::downgrade(&game), ticks);

        Ok((
            game,
            GameChannels { events, attacks, being_ko, game_over },
        ))
    }

    /// Start or resume the simulation.
    pub fn start(&self) {
        {
            let mut core = self.core.lock().unwrap();
            if !matches!(core.phase, GamePhase::Idle | GamePhase::Paused) {
                return;
            }
            core.phase = GamePhase::Running;
        }
        self.timer.start();
        self.send_event(GameEvent::Audio { cue: AudioCue::Background });
    }

    /// Suspend play, announcing the pause.
    pub fn pause(&self) {
        {
            let mut core = self.core.lock().unwrap();
            if core.phase != GamePhase::Running {
                return;
            }
            core.phase = GamePhase::Paused;
        }
        self.timer.pause();
        self.send_event(GameEvent::Pause);
        self.send_event(GameEvent::Audio { cue: AudioCue::Background });
    }

    /// Silently halt the simulation; used at match teardown.
    pub fn stop(&self) {
        let mut core = self.core.lock().unwrap();
        if core.phase == GamePhase::Running {
            core.phase = GamePhase::Paused;
        }
        drop(core);
        self.timer.pause();
    }

    /// Terminal transition: emits the final game-over event and signals
    /// the dispatcher.
    pub fn end(&self) {
        {
            let mut core = self.core.lock().unwrap();
            if core.phase == GamePhase::Over {
                return;
            }
            core.phase = GamePhase::Over;
        }
        self.timer.pause();
        self.send_event(GameEvent::GameOver);
        if self.game_over_tx.try_send(()).is_err() {
            warn!("game-over signal dropped: channel closed or full");
        }
    }

    pub fn move_down(&self) {
        self.step(true, false);
    }

    pub fn drop_down(&self) {
        self.step(false, true);
    }

    pub fn move_left(&self) {
        {
            let mut core = self.core.lock().unwrap();
            if core.phase == GamePhase::Running && core.zone.can_move_left(&core.active.block) {
                core.active.block = core.active.block.left();
            }
        }
        self.step(false, false);
    }

    pub fn move_right(&self) {
        {
            let mut core = self.core.lock().unwrap();
            if core.phase == GamePhase::Running && core.zone.can_move_right(&core.active.block) {
                core.active.block = core.active.block.right();
            }
        }
        self.step(false, false);
    }

    pub fn rotate(&self) {
        {
            let mut core = self.core.lock().unwrap();
            if core.phase == GamePhase::Running {
                if let Some(rotated) = core.zone.try_rotate(&core.active.block) {
                    core.active.block = rotated;
                }
            }
        }
        self.step(false, false);
    }

    /// Stash or swap the active piece. At most one hold per lock cycle;
    /// a swapped-in piece comes back in its spawn orientation.
    pub fn hold(&self) {
        let mut out = Outbox::default();
        {
            let mut core = self.core.lock().unwrap();
            if core.phase == GamePhase::Running && !core.held_this_piece {
                core.held_this_piece = true;
                let incoming = match core.held.take() {
                    None => {
                        let refill =
                            Piece::random(&mut rand::thread_rng(), core.spawn_col());
                        core.queue.exchange(refill)
                    }
                    Some(mut held) => {
                        held.respawn();
                        held
                    }
                };
                let stashed = std::mem::replace(&mut core.active, incoming);
                core.held = Some(stashed);
                if let Some(held) = &core.held {
                    out.events.push(GameEvent::HoldPiece { piece: held.grid() });
                }
            }
        }
        self.flush(out);
        self.step(false, false);
    }

    /// Receive `lines` of garbage from the opponent. Absorbable garbage
    /// becomes stone rows at the bottom; unabsorbable garbage is a KO:
    /// the stone rows are stripped instead and the KO signal raised.
    pub fn being_attacked(&self, lines: u32) {
        let mut out = Outbox::default();
        {
            let mut core = self.core.lock().unwrap();
            if core.phase == GamePhase::Running {
                if core.zone.can_fill_stone_lines(lines as usize) {
                    core.zone
                        .add_stone_lines(lines as usize, &mut rand::thread_rng());
                } else {
                    core.zone.remove_stone_lines();
                    out.being_ko = true;
                }
            }
        }
        self.flush(out);
        self.step(false, false);
    }

    /// Credit this player with a KO on the opponent. Returns the new
    /// tally so the caller can apply the sudden-death threshold.
    pub fn ko_opponent(&self) -> u32 {
        let count = {
            let mut core = self.core.lock().unwrap();
            core.kos += 1;
            core.kos
        };
        self.send_event(GameEvent::Ko { count });
        self.send_event(GameEvent::Audio { cue: AudioCue::Ko });
        count
    }

    /// KOs dealt to the opponent.
    pub fn kos(&self) -> u32 {
        self.core.lock().unwrap().kos
    }

    /// Cumulative lines sent.
    pub fn lines_sent(&self) -> u32 {
        self.core.lock().unwrap().lines_sent
    }

    pub fn phase(&self) -> GamePhase {
        self.core.lock().unwrap().phase
    }

    pub fn is_over(&self) -> bool {
        self.phase() == GamePhase::Over
    }

    /// One simulation pass; also the tail of every player command.
    fn step(&self, move_down: bool, drop: bool) {
        let mut out = Outbox::default();
        {
            let mut core = self.core.lock().unwrap();
            if core.phase != GamePhase::Running {
                return;
            }
            core.advance(move_down, drop, &mut rand::thread_rng(), &mut out);
        }
        self.flush(out);
    }

    fn flush(&self, out: Outbox) {
        if out.reset_timer {
            self.timer.reset();
        }
        for event in out.events {
            self.send_event(event);
        }
        if let Some(lines) = out.attack {
            if self.attacks_tx.try_send(lines).is_err() {
                warn!(lines, "attack dropped: channel closed or full");
            }
        }
        if out.being_ko && self.being_ko_tx.try_send(()).is_err() {
            warn!("being-KO signal dropped: channel closed or full");
        }
    }

    fn send_event(&self, event: GameEvent) {
        if self.events_tx.try_send(event).is_err() {
            warn!("game event dropped: channel closed or full");
        }
    }

    #[cfg(test)]
    fn with_core<R>(&self, f: impl FnOnce(&mut GameCore) -> R) -> R {
        f(&mut self.core.lock().unwrap())
    }
}

/// Autonomous descent: one step per timer tick until the game ends.
fn spawn_descent_driver(game: Weak<Game>, mut ticks: TimerTicks) {
    tokio::spawn(async move {
        while ticks.wait().await {
            let Some(game) = game.upgrade() else { break };
            game.step(true, false);
            if game.is_over() {
                break;
            }
        }
    });
}
