//! The per-match event loop.
//!
//! One dispatcher task runs per match. It multiplexes both games'
//! outbound channels, the one-second match countdown and the table's
//! quit signal, fans events out to the right audience, crosses attack
//! lines to the opposing game, applies the sudden-death KO threshold,
//! and on any terminal condition settles the result exactly once.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::game::{Game, GameChannels, GameEvent};
use crate::protocol::{Audience, EventSink, Ranking, ServerMessage};
use crate::table::table::{MatchSignal, MatchStart, Table};

/// How a match reached its end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    /// Quit, leaving the named seat vacant.
    Quit(usize),
    /// Countdown expiry, sudden death, or a normal game-over: the score
    /// comparison decides.
    Scored,
}

/// Run one match to completion. Spawned once per [`Table::start_game`].
pub async fn run_match(
    table: Arc<Table>,
    start: MatchStart,
    sink: Arc<dyn EventSink>,
    ranking: Arc<dyn Ranking>,
) {
    let MatchStart { players, games, channels, mut countdown, mut signals } = start;
    let [channels1, channels2] = channels;
    let GameChannels {
        events: mut events1,
        attacks: mut attacks1,
        being_ko: mut being_ko1,
        game_over: mut over1,
    } = channels1;
    let GameChannels {
        events: mut events2,
        attacks: mut attacks2,
        being_ko: mut being_ko2,
        game_over: mut over2,
    } = channels2;

    for count in (1..=table.config().start_countdown).rev() {
        sink.deliver(Audience::All, ServerMessage::Start { count });
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    if let Err(err) = table.begin_play() {
        warn!(table = table.id(), %err, "match vanished before play began");
        table.reset();
        return;
    }

    let outcome = loop {
        tokio::select! {
            Some(event) = events1.recv() => deliver_event(&*sink, 0, event),
            Some(event) = events2.recv() => deliver_event(&*sink, 1, event),
            // Attack lines always cross to the opposing game.
            Some(lines) = attacks1.recv() => games[1].being_attacked(lines),
            Some(lines) = attacks2.recv() => games[0].being_attacked(lines),
            Some(()) = being_ko1.recv() => knock_out(&*sink, &games, 0),
            Some(()) = being_ko2.recv() => knock_out(&*sink, &games, 1),
            Some(()) = over1.recv() => break Outcome::Scored,
            Some(()) = over2.recv() => break Outcome::Scored,
            alive = countdown.wait() => {
                if !alive {
                    break Outcome::Scored;
                }
                let remaining = table.tick_countdown();
                sink.deliver(Audience::All, ServerMessage::Timer { secs: remaining });
                if remaining == 0 {
                    break Outcome::Scored;
                }
            }
            Some(signal) = signals.recv() => match signal {
                MatchSignal::SeatQuit(seat) => break Outcome::Quit(seat),
            },
            else => break Outcome::Scored,
        }
    };

    table.stop_game();

    let winner_seat = match outcome {
        Outcome::Quit(seat) => seat ^ 1,
        Outcome::Scored => scored_winner(&games),
    };
    let winner = players[winner_seat];
    let loser = players[winner_seat ^ 1];
    let table_id = table.id();
    info!(table = table_id, winner, loser, ?outcome, "match concluded");
    sink.deliver(Audience::All, ServerMessage::Result { table_id, winner, loser });

    let report = if crate::is_tournament_table(table_id) {
        ranking.tournament_result(table_id, winner, loser).map(|next| {
            info!(table = table_id, winner, next_table = next, "winner advances");
        })
    } else {
        ranking.normal_result(table_id, winner, loser, table.bet())
    };
    if let Err(err) = report {
        warn!(table = table_id, %err, "failed to report match result");
    }

    table.reset();
}

/// Fan-out scope for one seat's event.
fn audience_for(seat: usize, event: &GameEvent) -> Audience {
    match event {
        GameEvent::Audio { .. } | GameEvent::Ko { .. } => Audience::Player(seat),
        GameEvent::Clear | GameEvent::Combo { .. } | GameEvent::Attack { .. } => {
            Audience::PlayerAndObservers(seat)
        }
        _ => Audience::All,
    }
}

fn deliver_event(sink: &dyn EventSink, seat: usize, event: GameEvent) {
    let audience = audience_for(seat, &event);
    sink.deliver(audience, ServerMessage::Game { seat: seat as u8 + 1, event });
}

/// Credit the victim's opponent with a KO; at the sudden-death threshold
/// the victim's game ends immediately.
fn knock_out(sink: &dyn EventSink, games: &[Arc<Game>; 2], victim: usize) {
    let count = games[victim ^ 1].ko_opponent();
    sink.deliver(
        Audience::All,
        ServerMessage::Game {
            seat: victim as u8 + 1,
            event: GameEvent::BeingKo { count },
        },
    );
    if count >= crate::KO_LIMIT {
        games[victim].end();
    }
}

/// Score comparison: KO count, then lines sent, tie to the first seat.
fn scored_winner(games: &[Arc<Game>; 2]) -> usize {
    let kos = [games[0].kos(), games[1].kos()];
    if kos[0] != kos[1] {
        return if kos[0] > kos[1] { 0 } else { 1 };
    }
    let lines = [games[0].lines_sent(), games[1].lines_sent()];
    if lines[1] > lines[0] {
        1
    } else {
        0
    }
}
