//! Per-market serialization locks.
//!
//! Trade execution and settlement both mutate a market's ledger state
//! from quantities they read moments earlier, so the two engines share
//! one lock per market and hold it from the first read through commit.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::domain::MarketId;

/// Registry of per-market locks, created on first use.
#[derive(Debug, Default)]
pub struct MarketLocks {
    locks: DashMap<MarketId, Arc<Mutex<()>>>,
}

impl MarketLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding one market's trade/settlement execution.
    #[must_use]
    pub fn for_market(&self, market_id: &MarketId) -> Arc<Mutex<()>> {
        self.locks
            .entry(market_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_market_shares_one_lock() {
        let locks = MarketLocks::new();
        let a = locks.for_market(&MarketId::from("m1"));
        let b = locks.for_market(&MarketId::from("m1"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_markets_get_different_locks() {
        let locks = MarketLocks::new();
        let a = locks.for_market(&MarketId::from("m1"));
        let b = locks.for_market(&MarketId::from("m2"));
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
