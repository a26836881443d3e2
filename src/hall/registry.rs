//! Shared table registry with background expiry sweeping.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::hall::HallError;
use crate::protocol::TableId;
use crate::table::{Table, TableSnapshot};

/// Expiry sweep pacing.
#[derive(Clone, Debug)]
pub struct SweepConfig {
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(5) }
    }
}

/// Owned, injected table registry: the live id map plus the set of
/// expired ids awaiting reclamation. Halls share one registry so the
/// id space stays coherent.
pub struct TableRegistry {
    tables: RwLock<HashMap<TableId, Arc<Table>>>,
    expired: RwLock<HashSet<TableId>>,
}

impl TableRegistry {
    pub fn new() -> Arc<TableRegistry> {
        Arc::new(TableRegistry {
            tables: RwLock::new(HashMap::new()),
            expired: RwLock::new(HashSet::new()),
        })
    }

    pub fn insert(&self, table: Arc<Table>) -> Result<(), HallError> {
        let mut tables = self.tables.write().unwrap();
        let id = table.id();
        if tables.contains_key(&id) {
            return Err(HallError::IdCollision(id));
        }
        tables.insert(id, table);
        Ok(())
    }

    pub fn get(&self, id: TableId) -> Option<Arc<Table>> {
        self.tables.read().unwrap().get(&id).cloned()
    }

    pub fn contains(&self, id: TableId) -> bool {
        self.tables.read().unwrap().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tables.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().unwrap().is_empty()
    }

    /// Remove a table from both the live map and the expired set.
    pub fn release(&self, id: TableId) {
        self.tables.write().unwrap().remove(&id);
        self.expired.write().unwrap().remove(&id);
    }

    /// Ids currently flagged for reclamation.
    pub fn expired_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<TableId> = self.expired.read().unwrap().iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// One expiry pass: flag stale tables and record them for
    /// reclamation. Returns how many newly expired.
    pub fn sweep_once(&self, now: Instant) -> usize {
        let stale: Vec<(TableId, Arc<Table>)> = {
            let tables = self.tables.read().unwrap();
            tables
                .iter()
                .filter(|(_, t)| t.is_expired(now))
                .map(|(id, t)| (*id, Arc::clone(t)))
                .collect()
        };

        let mut expired = self.expired.write().unwrap();
        let mut fresh = 0;
        for (id, table) in stale {
            table.expire();
            if expired.insert(id) {
                fresh += 1;
            }
        }
        fresh
    }

    /// Drop every table flagged by the sweep; returns the reclaimed ids.
    pub fn reclaim_expired(&self) -> Vec<TableId> {
        let ids = self.expired_ids();
        for &id in &ids {
            self.release(id);
        }
        ids
    }

    /// Periodic sweep task. Abort the handle to stop it.
    pub fn spawn_sweeper(self: &Arc<Self>, config: SweepConfig) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            loop {
                interval.tick().await;
                let fresh = registry.sweep_once(Instant::now());
                if fresh > 0 {
                    info!(expired = fresh, "expiry sweep flagged stale tables");
                } else {
                    debug!("expiry sweep found nothing stale");
                }
            }
        })
    }

    /// Lobby listing: snapshots of every live table, id order.
    pub fn wrap(&self) -> Vec<TableSnapshot> {
        let mut snapshots: Vec<TableSnapshot> = self
            .tables
            .read()
            .unwrap()
            .values()
            .map(|t| t.wrap())
            .collect();
        snapshots.sort_by_key(|s| s.id);
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{TableConfig, TableInfo};

    fn table(id: TableId) -> Arc<Table> {
        Table::new(
            TableInfo { id, title: format!("table {id}"), host: 1, bet: 0 },
            TableConfig::default(),
        )
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let registry = TableRegistry::new();
        registry.insert(table(3)).unwrap();
        assert!(matches!(registry.insert(table(3)), Err(HallError::IdCollision(3))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_release_clears_both_registries() {
        let registry = TableRegistry::new();
        let t = table(4);
        registry.insert(Arc::clone(&t)).unwrap();
        t.expire();
        assert_eq!(registry.sweep_once(Instant::now()), 1);
        assert_eq!(registry.expired_ids(), vec![4]);

        registry.release(4);
        assert!(registry.get(4).is_none());
        assert!(registry.expired_ids().is_empty());
    }

    #[test]
    fn test_sweep_flags_only_stale_tables() {
        let registry = TableRegistry::new();
        let stale = Table::new(
            TableInfo { id: 1, title: "stale".into(), host: 1, bet: 0 },
            TableConfig { waiting_expire: Duration::from_secs(0), ..TableConfig::default() },
        );
        registry.insert(stale).unwrap();
        registry.insert(table(2)).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(registry.sweep_once(Instant::now()), 1);
        assert_eq!(registry.expired_ids(), vec![1]);
        // A second pass reports nothing new.
        assert_eq!(registry.sweep_once(Instant::now()), 0);

        assert_eq!(registry.reclaim_expired(), vec![1]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_wrap_lists_in_id_order() {
        let registry = TableRegistry::new();
        registry.insert(table(9)).unwrap();
        registry.insert(table(2)).unwrap();
        let ids: Vec<TableId> = registry.wrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 9]);
    }
}
