//! Single-elimination tournament bracket.
//!
//! The bracket allocates players onto round-namespaced tables
//! (`(round+1) * 100_000 + base`), recycling seats vacated by early
//! withdrawal before opening new tables, and records per-round winners
//! and losers until the final is decided.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::info;

use crate::hall::registry::TableRegistry;
use crate::hall::HallError;
use crate::protocol::{TableId, Uid};
use crate::table::{Table, TableConfig, TableInfo, TableSnapshot};

/// Bracket lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TournamentStatus {
    /// Enrollment open.
    Waiting,
    /// Bracket for the current round fixed, awaiting start.
    Pending,
    /// Round in progress.
    InGame,
    /// Final decided.
    End,
}

impl TournamentStatus {
    fn as_str(self) -> &'static str {
        match self {
            TournamentStatus::Waiting => "waiting",
            TournamentStatus::Pending => "pending",
            TournamentStatus::InGame => "in_game",
            TournamentStatus::End => "end",
        }
    }
}

struct BracketState {
    status: TournamentStatus,
    round: u32,
    current_candidate: u32,
    /// Sequential base within the current round's id namespace.
    next_base: TableId,
    /// Half-filled table awaiting its second player.
    current_table: Option<TableId>,
    /// Seats vacated by withdrawal, keyed by table; filled before any
    /// new table is opened. BTreeMap keeps the pick deterministic.
    idle_seats: BTreeMap<TableId, u32>,
    /// Live tables of the current round.
    tables: BTreeSet<TableId>,
    winners: HashMap<u32, Vec<Uid>>,
    losers: HashMap<u32, Vec<Uid>>,
}

/// Lobby view of the bracket.
#[derive(Clone, Debug, Serialize)]
pub struct TournamentSnapshot {
    pub status: &'static str,
    pub round: u32,
    pub num_candidate: u32,
    pub current_candidate: u32,
    pub tables: Vec<TableSnapshot>,
}

/// A single-elimination bracket over a shared table registry.
pub struct TournamentHall {
    registry: Arc<TableRegistry>,
    config: TableConfig,
    num_candidate: u32,
    state: Mutex<BracketState>,
}

impl TournamentHall {
    /// Capacity must be a power of two of at least 2.
    pub fn new(
        num_candidate: u32,
        registry: Arc<TableRegistry>,
        config: TableConfig,
    ) -> Result<TournamentHall, HallError> {
        if num_candidate < 2 || !num_candidate.is_power_of_two() {
            return Err(HallError::InvalidCapacity(num_candidate));
        }
        Ok(TournamentHall {
            registry,
            config,
            num_candidate,
            state: Mutex::new(BracketState {
                status: TournamentStatus::Waiting,
                round: 0,
                current_candidate: 0,
                next_base: 0,
                current_table: None,
                idle_seats: BTreeMap::new(),
                tables: BTreeSet::new(),
                winners: HashMap::new(),
                losers: HashMap::new(),
            }),
        })
    }

    pub fn num_candidate(&self) -> u32 {
        self.num_candidate
    }

    pub fn current_candidate(&self) -> u32 {
        self.state.lock().unwrap().current_candidate
    }

    pub fn round(&self) -> u32 {
        self.state.lock().unwrap().round
    }

    pub fn status(&self) -> TournamentStatus {
        self.state.lock().unwrap().status
    }

    /// Enroll a candidate. Only valid while enrollment is open and
    /// under capacity.
    pub fn apply(&self, uid: Uid, nickname: &str) -> Result<TableId, HallError> {
        let mut state = self.state.lock().unwrap();
        if state.status != TournamentStatus::Waiting {
            return Err(HallError::WrongStatus(state.status.as_str()));
        }
        if state.current_candidate >= self.num_candidate {
            return Err(HallError::EnrollmentFull(self.num_candidate));
        }
        let id = self.place(&mut state, uid, nickname)?;
        state.current_candidate += 1;
        Ok(id)
    }

    /// Seat a player for round advancement; same placement policy as
    /// enrollment but uncapped and without touching the candidate count.
    pub fn allocate(&self, uid: Uid, nickname: &str) -> Result<TableId, HallError> {
        let mut state = self.state.lock().unwrap();
        self.place(&mut state, uid, nickname)
    }

    /// Idle-recycled seat first, then the half-filled current table,
    /// then a fresh table in this round's id namespace.
    fn place(
        &self,
        state: &mut BracketState,
        uid: Uid,
        nickname: &str,
    ) -> Result<TableId, HallError> {
        if let Some((&id, _)) = state.idle_seats.iter().next() {
            let table = self.registry.get(id).ok_or(HallError::TableNotFound(id))?;
            table.join(uid, nickname)?;
            match state.idle_seats.get_mut(&id) {
                Some(count) if *count > 1 => *count -= 1,
                _ => {
                    state.idle_seats.remove(&id);
                }
            }
            return Ok(id);
        }

        if let Some(id) = state.current_table {
            let table = self.registry.get(id).ok_or(HallError::TableNotFound(id))?;
            table.join(uid, nickname)?;
            if table.is_full() {
                state.current_table = None;
            }
            return Ok(id);
        }

        let id = (state.round + 1) * crate::TOURNAMENT_ID_BASE + state.next_base;
        state.next_base += 1;
        let table = Table::new(
            TableInfo {
                id,
                title: format!("tournament round {}", state.round + 1),
                host: uid,
                bet: 0,
            },
            self.config.clone(),
        );
        table.join(uid, nickname)?;
        self.registry.insert(Arc::clone(&table))?;
        state.tables.insert(id);
        state.current_table = Some(id);
        info!(table = id, round = state.round, "bracket table opened");
        Ok(id)
    }

    /// Withdraw from a bracket table. A vacated player seat is recycled
    /// by the next allocation; observers are simply removed.
    pub fn quit(&self, table_id: TableId, uid: Uid) -> Result<(), HallError> {
        let table = self
            .registry
            .get(table_id)
            .ok_or(HallError::TableNotFound(table_id))?;
        let was_seated = table.seat_of(uid).is_some();
        table.quit(uid)?;
        if was_seated {
            let mut state = self.state.lock().unwrap();
            *state.idle_seats.entry(table_id).or_insert(0) += 1;
            state.current_candidate = state.current_candidate.saturating_sub(1);
        }
        Ok(())
    }

    /// Record a decided pairing under the current round and delete the
    /// finished table.
    pub fn set_winner_loser(&self, table_id: TableId, winner: Uid) -> Result<(), HallError> {
        let table = self
            .registry
            .get(table_id)
            .ok_or(HallError::TableNotFound(table_id))?;
        if table.seat_of(winner).is_none() {
            return Err(HallError::PlayerNotSeated(winner));
        }
        let loser = table
            .wrap()
            .seats
            .iter()
            .flatten()
            .map(|s| s.uid)
            .find(|&uid| uid != winner);

        let mut state = self.state.lock().unwrap();
        let round = state.round;
        state.winners.entry(round).or_default().push(winner);
        if let Some(loser) = loser {
            state.losers.entry(round).or_default().push(loser);
        }
        state.tables.remove(&table_id);
        state.idle_seats.remove(&table_id);
        if state.current_table == Some(table_id) {
            state.current_table = None;
        }
        drop(state);

        self.registry.release(table_id);
        info!(table = table_id, winner, "bracket pairing decided");
        Ok(())
    }

    /// The current round's bracket is complete: exactly
    /// `num_candidate >> (round+1)` tables, every seat filled.
    pub fn is_full(&self) -> bool {
        let state = self.state.lock().unwrap();
        let expected = (self.num_candidate >> (state.round + 1)) as usize;
        state.tables.len() == expected
            && state
                .tables
                .iter()
                .all(|&id| self.registry.get(id).is_some_and(|t| t.is_full()))
    }

    /// The final has been decided.
    pub fn should_end(&self) -> bool {
        let state = self.state.lock().unwrap();
        1u32 << state.round == self.num_candidate
    }

    /// Close enrollment: `Waiting` → `Pending`.
    pub fn set_pending(&self) -> Result<(), HallError> {
        let mut state = self.state.lock().unwrap();
        if state.status != TournamentStatus::Waiting {
            return Err(HallError::WrongStatus(state.status.as_str()));
        }
        state.status = TournamentStatus::Pending;
        Ok(())
    }

    /// Start the round: `Pending` → `InGame`, gated on a full bracket.
    pub fn set_in_game(&self) -> Result<(), HallError> {
        if !self.is_full() {
            return Err(HallError::BracketNotReady);
        }
        let mut state = self.state.lock().unwrap();
        if state.status != TournamentStatus::Pending {
            return Err(HallError::WrongStatus(state.status.as_str()));
        }
        state.status = TournamentStatus::InGame;
        Ok(())
    }

    /// Round complete: move to the next round's namespace, or to `End`
    /// once the final is decided. The caller re-seats winners via
    /// [`TournamentHall::allocate`].
    pub fn advance_round(&self) -> Result<(), HallError> {
        let mut state = self.state.lock().unwrap();
        if state.status != TournamentStatus::InGame {
            return Err(HallError::WrongStatus(state.status.as_str()));
        }
        state.round += 1;
        state.next_base = 0;
        state.current_table = None;
        state.idle_seats.clear();
        state.tables.clear();
        if 1u32 << state.round == self.num_candidate {
            state.status = TournamentStatus::End;
            info!(round = state.round, "tournament concluded");
        } else {
            state.status = TournamentStatus::Pending;
            info!(round = state.round, "bracket advanced");
        }
        Ok(())
    }

    pub fn winners(&self, round: u32) -> Vec<Uid> {
        self.state
            .lock()
            .unwrap()
            .winners
            .get(&round)
            .cloned()
            .unwrap_or_default()
    }

    pub fn losers(&self, round: u32) -> Vec<Uid> {
        self.state
            .lock()
            .unwrap()
            .losers
            .get(&round)
            .cloned()
            .unwrap_or_default()
    }

    /// The overall winner, once the bracket has ended.
    pub fn champion(&self) -> Option<Uid> {
        let state = self.state.lock().unwrap();
        if state.status != TournamentStatus::End {
            return None;
        }
        state
            .winners
            .get(&(state.round - 1))
            .and_then(|w| w.first())
            .copied()
    }

    /// One-line lobby status.
    pub fn status_text(&self) -> String {
        let state = self.state.lock().unwrap();
        match state.status {
            TournamentStatus::Waiting => format!(
                "enrolling {}/{}",
                state.current_candidate, self.num_candidate
            ),
            TournamentStatus::Pending => {
                format!("round {} pending", state.round + 1)
            }
            TournamentStatus::InGame => {
                format!("round {} in game", state.round + 1)
            }
            TournamentStatus::End => "concluded".to_string(),
        }
    }

    /// Lobby snapshot: bracket status plus the current round's tables.
    pub fn wrap(&self) -> TournamentSnapshot {
        let state = self.state.lock().unwrap();
        let tables = state
            .tables
            .iter()
            .filter_map(|&id| self.registry.get(id).map(|t| t.wrap()))
            .collect();
        TournamentSnapshot {
            status: state.status.as_str(),
            round: state.round,
            num_candidate: self.num_candidate,
            current_candidate: state.current_candidate,
            tables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hall(capacity: u32) -> TournamentHall {
        TournamentHall::new(capacity, TableRegistry::new(), TableConfig::default()).unwrap()
    }

    #[test]
    fn test_capacity_must_be_a_power_of_two() {
        assert!(matches!(
            TournamentHall::new(6, TableRegistry::new(), TableConfig::default()),
            Err(HallError::InvalidCapacity(6))
        ));
        assert!(matches!(
            TournamentHall::new(1, TableRegistry::new(), TableConfig::default()),
            Err(HallError::InvalidCapacity(1))
        ));
        assert!(TournamentHall::new(8, TableRegistry::new(), TableConfig::default()).is_ok());
    }

    #[test]
    fn test_enrollment_pairs_onto_namespaced_tables() {
        let hall = hall(8);
        let ids: Vec<TableId> = (0..8)
            .map(|uid| hall.apply(uid, &format!("p{uid}")).unwrap())
            .collect();
        // Two players per table, ids in the round-0 namespace.
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[2], ids[3]);
        assert_eq!(ids, vec![
            100_000, 100_000, 100_001, 100_001, 100_002, 100_002, 100_003, 100_003,
        ]);
        assert!(ids.iter().all(|&id| crate::is_tournament_table(id)));
        assert!(hall.is_full());
        assert_eq!(hall.current_candidate(), 8);
    }

    #[test]
    fn test_enrollment_cap_and_status_gate() {
        let hall = hall(2);
        hall.apply(1, "a").unwrap();
        hall.apply(2, "b").unwrap();
        assert!(matches!(hall.apply(3, "c"), Err(HallError::EnrollmentFull(2))));

        hall.set_pending().unwrap();
        assert!(matches!(hall.apply(3, "c"), Err(HallError::WrongStatus("pending"))));
    }

    #[test]
    fn test_live_tables_never_exceed_bracket_width() {
        let hall = hall(8);
        for uid in 0..8 {
            hall.apply(uid, "p").unwrap();
            assert!(hall.wrap().tables.len() <= (8 >> 1));
        }
    }

    #[test]
    fn test_quit_frees_an_idle_seat_reused_first() {
        let hall = hall(8);
        let mut ids = Vec::new();
        for uid in 0..6 {
            ids.push(hall.apply(uid, "p").unwrap());
        }
        // uid 1 withdraws from the first (full) table.
        hall.quit(ids[1], 1).unwrap();
        assert_eq!(hall.current_candidate(), 5);

        // The vacated seat is filled before any new table opens.
        let id = hall.allocate(100, "late").unwrap();
        assert_eq!(id, ids[1]);
        assert_eq!(hall.wrap().tables.len(), 3);
    }

    #[test]
    fn test_eight_player_round_zero_resolves() {
        let hall = hall(8);
        let mut ids = Vec::new();
        for uid in 0..8 {
            ids.push(hall.apply(uid, "p").unwrap());
        }
        hall.set_pending().unwrap();
        hall.set_in_game().unwrap();

        let mut tables: Vec<TableId> = ids.clone();
        tables.dedup();
        for (i, &table_id) in tables.iter().enumerate() {
            // Even uids win their pairings.
            hall.set_winner_loser(table_id, (i * 2) as Uid).unwrap();
        }

        assert_eq!(hall.winners(0), vec![0, 2, 4, 6]);
        assert_eq!(hall.losers(0), vec![1, 3, 5, 7]);
        for table_id in tables {
            assert!(hall.registry.get(table_id).is_none());
        }
        assert!(hall.wrap().tables.is_empty());
    }

    #[test]
    fn test_round_advance_renames_the_namespace() {
        let hall = hall(4);
        let mut ids = Vec::new();
        for uid in 0..4 {
            ids.push(hall.apply(uid, "p").unwrap());
        }
        hall.set_pending().unwrap();
        hall.set_in_game().unwrap();
        hall.set_winner_loser(ids[0], 0).unwrap();
        hall.set_winner_loser(ids[2], 2).unwrap();
        hall.advance_round().unwrap();

        assert_eq!(hall.status(), TournamentStatus::Pending);
        assert!(!hall.should_end());
        let final_table = hall.allocate(0, "p0").unwrap();
        assert_eq!(final_table, 200_000);
        hall.allocate(2, "p2").unwrap();
        assert!(hall.is_full());
    }

    #[test]
    fn test_final_round_ends_the_bracket() {
        let hall = hall(2);
        let id = hall.apply(1, "a").unwrap();
        hall.apply(2, "b").unwrap();
        hall.set_pending().unwrap();
        hall.set_in_game().unwrap();
        hall.set_winner_loser(id, 2).unwrap();
        hall.advance_round().unwrap();

        assert_eq!(hall.status(), TournamentStatus::End);
        assert!(hall.should_end());
        assert_eq!(hall.champion(), Some(2));
    }

    #[test]
    fn test_set_in_game_requires_a_full_bracket() {
        let hall = hall(4);
        hall.apply(1, "a").unwrap();
        hall.set_pending().unwrap();
        assert!(matches!(hall.set_in_game(), Err(HallError::BracketNotReady)));
    }
}
