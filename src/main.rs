//! Tetris Duel Server
//!
//! Runs a scripted demonstration match: two seated players trading
//! random inputs under the real dispatcher, countdown and scoring.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tetris_duel::game::GameConfig;
use tetris_duel::protocol::{
    Audience, EventSink, Ranking, RankingError, ServerMessage, TableId, Uid,
};
use tetris_duel::table::{run_match, TableConfig};
use tetris_duel::{Game, NormalHall, TableRegistry, VERSION};

/// Logs every outbound message; a real deployment delivers them over
/// the session layer instead.
struct TracingSink;

impl EventSink for TracingSink {
    fn deliver(&self, audience: Audience, message: ServerMessage) {
        match serde_json::to_string(&message) {
            Ok(json) => info!(?audience, %json, "deliver"),
            Err(err) => info!(?audience, %err, "undeliverable message"),
        }
    }
}

/// Logs match results instead of settling them.
struct TracingRanking;

impl Ranking for TracingRanking {
    fn normal_result(
        &self,
        table_id: TableId,
        winner: Uid,
        loser: Uid,
        bet: u64,
    ) -> Result<(), RankingError> {
        info!(table_id, winner, loser, bet, "match result");
        Ok(())
    }

    fn tournament_result(
        &self,
        table_id: TableId,
        winner: Uid,
        loser: Uid,
    ) -> Result<TableId, RankingError> {
        info!(table_id, winner, loser, "bracket result");
        Ok(table_id)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Tetris Duel Server v{VERSION}");
    demo_match().await
}

/// One free-play match between two scripted players.
async fn demo_match() -> Result<()> {
    let registry = TableRegistry::new();
    let _sweeper = registry.spawn_sweeper(Default::default());

    let hall = NormalHall::new(
        Arc::clone(&registry),
        TableConfig {
            countdown_secs: 20,
            game: GameConfig { descent_interval_ms: 500, ..GameConfig::default() },
            ..TableConfig::default()
        },
    );

    let table = hall.create_table("demo", 1, 0)?;
    table.join(1, "alice")?;
    table.join(2, "bob")?;
    table.switch_ready(1)?;
    table.switch_ready(2)?;
    info!(table = table.id(), "both players ready, starting match");

    let start = table.start_game()?;
    let games = [Arc::clone(&start.games[0]), Arc::clone(&start.games[1])];
    let dispatcher = tokio::spawn(run_match(
        Arc::clone(&table),
        start,
        Arc::new(TracingSink),
        Arc::new(TracingRanking),
    ));

    let players = games.map(|game| tokio::spawn(scripted_player(game)));
    dispatcher.await?;
    for player in players {
        player.abort();
    }

    info!("demo match finished");
    Ok(())
}

/// Random inputs at a human-ish cadence until the game ends.
async fn scripted_player(game: Arc<Game>) {
    let mut interval = tokio::time::interval(Duration::from_millis(250));
    while !game.is_over() {
        interval.tick().await;
        match rand::thread_rng().gen_range(0..6) {
            0 => game.move_left(),
            1 => game.move_right(),
            2 => game.move_down(),
            3 => game.rotate(),
            4 => game.hold(),
            _ => game.drop_down(),
        }
    }
}
