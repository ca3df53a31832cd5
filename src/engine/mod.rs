//! Write and read engines over the market ledger.
//!
//! - [`TradeExecutor`] - atomic buy execution priced by LMSR
//! - [`SettlementEngine`] - terminal market resolution with payouts
//! - [`Valuator`] - read-only quotes, portfolios, and the leaderboard
//!
//! The two mutating engines share a [`MarketLocks`] registry so trades
//! and settlement on one market serialize.

pub mod locks;
pub mod settlement;
pub mod trade;
pub mod valuation;

pub use locks::MarketLocks;
pub use settlement::{Payout, Settlement, SettlementEngine};
pub use trade::{Fill, TradeExecutor};
pub use valuation::{
    Holding, LeaderboardEntry, MarketQuote, OutcomeQuote, Portfolio, Valuator,
};
