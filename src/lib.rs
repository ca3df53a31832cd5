//! oddsmill - an LMSR market maker for discrete-outcome prediction markets.
//!
//! A market carries a fixed set of outcomes and an LMSR cost function
//! parameterized by a liquidity constant `b`. Users buy outcome shares
//! from the automated market maker at path-independent prices; resolving
//! a market pays one unit per winning share. All balances, share
//! quantities, and realized costs are exact decimals persisted in
//! SQLite; only the pricing math itself runs in floating point.
//!
//! Module map:
//! - [`pricing`] - the pure LMSR cost/price engine
//! - [`domain`] - markets, orders, positions, and their invariants
//! - [`ledger`] - persistence over Diesel/SQLite
//! - [`engine`] - trade execution, settlement, and valuation
//! - [`cli`] - the command-line surface

pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod pricing;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use error::{Error, Result};
