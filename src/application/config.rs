use chrono::Duration;

use crate::domain::Cents;
use crate::storage::StoreConfig;

/// Policy knobs for the ledger engine.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// How long after creation a regular user may still delete their own transaction.
    /// Admins are not bound by it.
    pub deletion_window_hours: i64,
    /// Smallest amount accepted for a direct withdrawal or a withdrawal request. 0 disables it.
    pub min_withdrawal: Cents,
    pub store: StoreConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            deletion_window_hours: 24,
            min_withdrawal: 0,
            store: StoreConfig::default(),
        }
    }
}

impl LedgerConfig {
    pub fn deletion_window(&self) -> Duration {
        Duration::hours(self.deletion_window_hours)
    }
}
