use std::sync::Arc;
use tracing::{debug, info};

use super::clock::Clock;
use super::request_store::RequestStore;
use crate::constants::events;

/// Drops history entries older than the retention horizon
pub struct HistoryPruner {
    store: Arc<RequestStore>,
    clock: Arc<dyn Clock>,
    retention: chrono::Duration,
}

impl HistoryPruner {
    pub fn new(store: Arc<RequestStore>, clock: Arc<dyn Clock>, retention: chrono::Duration) -> Self {
        Self {
            store,
            clock,
            retention,
        }
    }

    /// Returns how many entries were removed
    pub fn prune(&self) -> usize {
        let horizon = self.clock.now() - self.retention;
        let pruned = self.store.prune_history(horizon);
        if pruned > 0 {
            info!(
                event = events::HISTORY_PRUNED,
                pruned = pruned,
                horizon = %horizon.to_rfc3339(),
                remaining = self.store.history_len(),
                "Pruned request history"
            );
        } else {
            debug!(horizon = %horizon.to_rfc3339(), "No history entries past retention");
        }
        pruned
    }
}

impl std::fmt::Debug for HistoryPruner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryPruner")
            .field("retention_days", &self.retention.num_days())
            .finish_non_exhaustive()
    }
}
