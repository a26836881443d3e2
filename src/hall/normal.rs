//! The free-play hall: table creation with a rolling id cursor.

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::hall::registry::TableRegistry;
use crate::hall::HallError;
use crate::protocol::{TableId, Uid};
use crate::table::{Table, TableConfig, TableInfo};

/// Starting ceiling for free-play ids; doubled whenever a full scan
/// finds no free id. Free-play ids never reach the tournament range.
const INITIAL_ID_CEILING: TableId = 512;

struct IdCursor {
    next: TableId,
    ceiling: TableId,
}

/// Allocates free-play tables into a shared registry.
pub struct NormalHall {
    registry: Arc<TableRegistry>,
    config: TableConfig,
    cursor: Mutex<IdCursor>,
}

impl NormalHall {
    pub fn new(registry: Arc<TableRegistry>, config: TableConfig) -> NormalHall {
        NormalHall {
            registry,
            config,
            cursor: Mutex::new(IdCursor { next: 1, ceiling: INITIAL_ID_CEILING }),
        }
    }

    #[cfg(test)]
    fn with_ceiling(registry: Arc<TableRegistry>, ceiling: TableId) -> NormalHall {
        NormalHall {
            registry,
            config: TableConfig::default(),
            cursor: Mutex::new(IdCursor { next: 1, ceiling }),
        }
    }

    /// Next unoccupied id at or after the cursor. A full fruitless scan
    /// doubles the ceiling and hands out the first id of the new range.
    pub fn next_table_id(&self) -> Result<TableId, HallError> {
        let mut cursor = self.cursor.lock().unwrap();
        let mut candidate = cursor.next;
        for _ in 0..cursor.ceiling {
            if candidate < 1 || candidate > cursor.ceiling {
                candidate = 1;
            }
            if !self.registry.contains(candidate) {
                cursor.next = candidate + 1;
                return Ok(candidate);
            }
            candidate += 1;
        }

        let old_ceiling = cursor.ceiling;
        let doubled = old_ceiling.saturating_mul(2);
        if doubled >= crate::TOURNAMENT_ID_BASE {
            return Err(HallError::IdSpaceExhausted);
        }
        info!(ceiling = doubled, "free-play id range exhausted, ceiling doubled");
        cursor.ceiling = doubled;
        cursor.next = old_ceiling + 2;
        Ok(old_ceiling + 1)
    }

    /// Open a new table hosted by `host` and register it.
    pub fn create_table(
        &self,
        title: &str,
        host: Uid,
        bet: u64,
    ) -> Result<Arc<Table>, HallError> {
        let id = self.next_table_id()?;
        let table = Table::new(
            TableInfo { id, title: title.to_string(), host, bet },
            self.config.clone(),
        );
        self.registry.insert(Arc::clone(&table))?;
        info!(table = id, host, "free-play table opened");
        Ok(table)
    }

    pub fn registry(&self) -> &Arc<TableRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential_from_one() {
        let hall = NormalHall::new(TableRegistry::new(), TableConfig::default());
        let a = hall.create_table("a", 10, 0).unwrap();
        let b = hall.create_table("b", 11, 0).unwrap();
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
    }

    #[test]
    fn test_cursor_skips_occupied_and_wraps() {
        let registry = TableRegistry::new();
        let hall = NormalHall::with_ceiling(Arc::clone(&registry), 4);
        let ids: Vec<TableId> = (0..3)
            .map(|_| hall.create_table("t", 1, 0).unwrap().id())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);

        // Free an early id; the cursor wraps around to find it.
        registry.release(2);
        assert_eq!(hall.next_table_id().unwrap(), 4);
        assert_eq!(hall.next_table_id().unwrap(), 2);
    }

    #[test]
    fn test_exhaustion_doubles_the_ceiling() {
        let registry = TableRegistry::new();
        let hall = NormalHall::with_ceiling(Arc::clone(&registry), 2);
        hall.create_table("a", 1, 0).unwrap();
        hall.create_table("b", 2, 0).unwrap();
        // Range 1..=2 is full: ceiling becomes 4, first new id is 3.
        let t = hall.create_table("c", 3, 0).unwrap();
        assert_eq!(t.id(), 3);
        assert_eq!(hall.next_table_id().unwrap(), 4);
    }

    #[test]
    fn test_free_play_ids_stay_below_tournament_range() {
        let registry = TableRegistry::new();
        let hall = NormalHall::with_ceiling(Arc::clone(&registry), crate::TOURNAMENT_ID_BASE / 2);
        // A forced doubling from half the tournament base would cross
        // into the reserved range, so allocation must refuse instead.
        for id in 1..=crate::TOURNAMENT_ID_BASE / 2 {
            registry
                .insert(Table::new(
                    TableInfo { id, title: String::new(), host: 1, bet: 0 },
                    TableConfig::default(),
                ))
                .unwrap();
        }
        assert!(matches!(hall.next_table_id(), Err(HallError::IdSpaceExhausted)));
    }
}
