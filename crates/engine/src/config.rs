//! Ledger tunables passed to the engine at build time.

use std::time::Duration;

/// Minor currency units needed to earn one point on a purchase.
pub const DEFAULT_CENTS_PER_POINT: i64 = 25;

/// Upper bound for a single atomic unit against the store.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    pub cents_per_point: i64,
    pub store_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            cents_per_point: DEFAULT_CENTS_PER_POINT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl LedgerConfig {
    #[must_use]
    pub fn cents_per_point(mut self, cents: i64) -> Self {
        self.cents_per_point = cents;
        self
    }

    #[must_use]
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}
