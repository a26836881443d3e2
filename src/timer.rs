//! Pausable, resettable periodic pulse generator.
//!
//! The timer pulses internally at a fixed 10 ms sub-interval and
//! accumulates sub-ticks modulo the configured interval; an external
//! tick is emitted only when the accumulator wraps to zero and the timer
//! is not paused. `pause`/`start` toggle emission without touching the
//! accumulator. `reset` puts the accumulator back to one sub-interval
//! elapsed, so a tick never fires immediately after a player action.
//!
//! The control half ([`Timer`]) and the consuming half ([`TimerTicks`])
//! are split: a tick-driving task awaits pulses while command handlers
//! pause or reset concurrently. The same type drives both a game's
//! automatic descent and a table's one-second match countdown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Internal pulse granularity in milliseconds.
pub const SUB_TICK_MS: u64 = 10;

struct TimerState {
    interval_ms: u64,
    elapsed_ms: u64,
    paused: bool,
}

/// Control half: pause, start and reset the pulse stream.
pub struct Timer {
    state: Arc<Mutex<TimerState>>,
    task: JoinHandle<()>,
}

/// Consuming half: awaits external ticks.
pub struct TimerTicks {
    rx: mpsc::Receiver<()>,
}

impl Timer {
    /// Create a paused timer emitting every `interval_ms` milliseconds.
    ///
    /// The interval must be a positive multiple of [`SUB_TICK_MS`].
    pub fn new(interval_ms: u64) -> (Timer, TimerTicks) {
        debug_assert!(interval_ms > 0 && interval_ms % SUB_TICK_MS == 0);
        let state = Arc::new(Mutex::new(TimerState {
            interval_ms,
            elapsed_ms: SUB_TICK_MS,
            paused: true,
        }));
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(run_pulses(Arc::clone(&state), tx));
        (Timer { state, task }, TimerTicks { rx })
    }

    /// Resume tick emission.
    pub fn start(&self) {
        self.state.lock().unwrap().paused = false;
    }

    /// Suspend tick emission without resetting the accumulator.
    pub fn pause(&self) {
        self.state.lock().unwrap().paused = true;
    }

    /// Push the next tick a full interval away.
    pub fn reset(&self) {
        self.state.lock().unwrap().elapsed_ms = SUB_TICK_MS;
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TimerTicks {
    /// Wait for the next external tick. Returns `false` once the control
    /// half has been dropped.
    pub async fn wait(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

async fn run_pulses(state: Arc<Mutex<TimerState>>, tx: mpsc::Sender<()>) {
    let mut pulse = tokio::time::interval(Duration::from_millis(SUB_TICK_MS));
    pulse.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        pulse.tick().await;
        let fire = {
            let mut s = state.lock().unwrap();
            if s.paused {
                false
            } else {
                s.elapsed_ms = (s.elapsed_ms + SUB_TICK_MS) % s.interval_ms;
                s.elapsed_ms == 0
            }
        };
        // Blocking send: if the consumer lags, the accumulator stalls
        // with it instead of piling up ticks.
        if fire && tx.send(()).await.is_err() {
            return;
        }
    }
}
