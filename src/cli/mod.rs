//! Command-line interface.
//!
//! Subcommands are thin wrappers over the ledger and engines: the CLI
//! parses arguments, calls one public API, and renders the result as a
//! table or, with `--json`, as machine-readable JSON. No market logic
//! lives here.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::config::Config;
use crate::db;
use crate::domain::{Market, MarketId, Outcome, OutcomeId, UserId};
use crate::engine::{MarketLocks, SettlementEngine, TradeExecutor, Valuator};
use crate::error::{Error, Result};
use crate::ledger::Ledger;

/// LMSR market-maker for discrete-outcome prediction markets
#[derive(Parser, Debug)]
#[command(name = "oddsmill")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: String,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands for the oddsmill CLI.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database and apply schema migrations
    Init,

    /// Add a user with the configured starting balance
    AddUser {
        /// User ID
        user: String,
        /// Override the starting balance
        #[arg(long)]
        balance: Option<Decimal>,
    },

    /// Credit a user's balance
    Deposit {
        /// User ID
        user: String,
        /// Amount to credit
        amount: Decimal,
    },

    /// Create a market with a fixed set of outcomes
    CreateMarket {
        /// Market ID
        market: String,
        /// The question being traded
        question: String,
        /// Outcome as `id:name`; repeat at least twice
        #[arg(long = "outcome", required = true, num_args = 1..)]
        outcomes: Vec<String>,
        /// Override the configured liquidity parameter
        #[arg(long)]
        liquidity: Option<f64>,
    },

    /// List all markets with live prices and volume
    Markets,

    /// Show one market with prices and outstanding quantities
    Market {
        /// Market ID
        market: String,
    },

    /// Buy shares of an outcome at the current LMSR price
    Buy {
        /// Market ID
        market: String,
        /// Buying user ID
        user: String,
        /// Outcome ID
        outcome: String,
        /// Shares to buy
        amount: Decimal,
    },

    /// Resolve a market and pay out winning shares
    Resolve {
        /// Market ID
        market: String,
        /// Winning outcome ID
        outcome: String,
    },

    /// Retire an open market without settlement
    Archive {
        /// Market ID
        market: String,
    },

    /// Show a user's balance and valued positions
    Portfolio {
        /// User ID
        user: String,
    },

    /// Rank all users by total equity
    Leaderboard,
}

fn parse_outcome(spec: &str) -> Result<Outcome> {
    let (id, name) = spec
        .split_once(':')
        .ok_or_else(|| Error::Parse(format!("outcome '{spec}' is not in id:name form")))?;
    Ok(Outcome::new(OutcomeId::from(id), name))
}

fn render<T: Tabled + Serialize>(rows: &[T], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
    } else {
        println!("{}", Table::new(rows).with(Style::sharp()));
    }
    Ok(())
}

fn render_value<T: Serialize>(value: &T, human: impl FnOnce() -> String, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", human());
    }
    Ok(())
}

#[derive(Tabled, Serialize)]
struct MarketListRow {
    market: String,
    question: String,
    status: String,
    volume: Decimal,
    prices: String,
}

#[derive(Tabled, Serialize)]
struct OutcomeRow {
    outcome: String,
    name: String,
    price: String,
    quantity: Decimal,
}

#[derive(Tabled, Serialize)]
struct HoldingRow {
    market: String,
    outcome: String,
    shares: Decimal,
    invested: Decimal,
    avg_cost: Decimal,
    price: String,
    value: Decimal,
}

#[derive(Tabled, Serialize)]
struct LeaderboardRow {
    rank: usize,
    user: String,
    balance: Decimal,
    positions: Decimal,
    equity: Decimal,
}

/// Execute a parsed CLI invocation against the configured database.
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let pool = db::create_pool(&config.database.url)?;

    if matches!(cli.command, Command::Init) {
        db::run_migrations(&pool)?;
        println!("database initialized at {}", config.database.url);
        return Ok(());
    }

    let ledger = Ledger::new(pool.clone());
    let valuator = Valuator::new(pool.clone());

    match cli.command {
        Command::Init => unreachable!("handled above"),

        Command::AddUser { user, balance } => {
            let user = UserId::from(user);
            let balance = balance.unwrap_or(config.market.starting_balance);
            ledger.add_user(&user, balance).await?;
            render_value(
                &serde_json::json!({ "user": &user, "balance": balance }),
                || format!("added user '{user}' with balance {balance}"),
                cli.json,
            )
        }

        Command::Deposit { user, amount } => {
            let user = UserId::from(user);
            let balance = ledger.deposit(&user, amount).await?;
            render_value(
                &serde_json::json!({ "user": &user, "balance": balance }),
                || format!("credited {amount}; balance is now {balance}"),
                cli.json,
            )
        }

        Command::CreateMarket {
            market,
            question,
            outcomes,
            liquidity,
        } => {
            let outcomes = outcomes
                .iter()
                .map(|s| parse_outcome(s))
                .collect::<Result<Vec<_>>>()?;
            let market = Market::try_new(
                MarketId::from(market),
                question,
                outcomes,
                liquidity.unwrap_or(config.market.liquidity),
            )?;
            ledger.create_market(&market).await?;
            render_value(
                &market,
                || {
                    format!(
                        "created market '{}' with {} outcomes (b = {})",
                        market.market_id(),
                        market.outcome_count(),
                        market.liquidity()
                    )
                },
                cli.json,
            )
        }

        Command::Markets => {
            let quotes = valuator.list_markets().await?;
            let rows: Vec<MarketListRow> = quotes
                .iter()
                .map(|q| MarketListRow {
                    market: q.market_id.to_string(),
                    question: q.question.clone(),
                    status: q.status.to_string(),
                    volume: q.volume,
                    prices: q
                        .outcomes
                        .iter()
                        .map(|o| format!("{} {:.4}", o.outcome_id, o.price))
                        .collect::<Vec<_>>()
                        .join("  "),
                })
                .collect();
            render(&rows, cli.json)
        }

        Command::Market { market } => {
            let quote = valuator.market_quote(&MarketId::from(market)).await?;
            if cli.json {
                return render_value(&quote, String::new, true);
            }
            println!("{} - {} [{}]", quote.market_id, quote.question, quote.status);
            if let Some(winner) = &quote.winner {
                println!("winner: {winner}");
            }
            println!("volume: {}", quote.volume);
            let rows: Vec<OutcomeRow> = quote
                .outcomes
                .iter()
                .map(|o| OutcomeRow {
                    outcome: o.outcome_id.to_string(),
                    name: o.name.clone(),
                    price: format!("{:.4}", o.price),
                    quantity: o.quantity,
                })
                .collect();
            render(&rows, false)
        }

        Command::Buy {
            market,
            user,
            outcome,
            amount,
        } => {
            let locks = std::sync::Arc::new(MarketLocks::new());
            let executor = TradeExecutor::new(pool.clone(), locks);
            let fill = executor
                .place_buy(
                    &MarketId::from(market),
                    &UserId::from(user),
                    &OutcomeId::from(outcome),
                    amount,
                )
                .await?;
            render_value(
                &fill,
                || format!("bought {} shares for {}", fill.shares, fill.cost),
                cli.json,
            )
        }

        Command::Resolve { market, outcome } => {
            let locks = std::sync::Arc::new(MarketLocks::new());
            let engine = SettlementEngine::new(pool.clone(), locks);
            let settlement = engine
                .resolve(&MarketId::from(market), &OutcomeId::from(outcome))
                .await?;
            render_value(
                &settlement,
                || {
                    format!(
                        "resolved '{}' with winner '{}'; {} payout(s) issued",
                        settlement.market_id,
                        settlement.winner,
                        settlement.payouts.len()
                    )
                },
                cli.json,
            )
        }

        Command::Archive { market } => {
            let market = MarketId::from(market);
            ledger.archive_market(&market).await?;
            render_value(
                &serde_json::json!({ "market": &market, "status": "archived" }),
                || format!("archived market '{market}'"),
                cli.json,
            )
        }

        Command::Portfolio { user } => {
            let portfolio = valuator.portfolio(&UserId::from(user)).await?;
            if cli.json {
                return render_value(&portfolio, String::new, true);
            }
            println!(
                "{}: balance {}, positions {}, equity {}",
                portfolio.user_id, portfolio.balance, portfolio.positions_value, portfolio.total_equity
            );
            let rows: Vec<HoldingRow> = portfolio
                .holdings
                .iter()
                .map(|h| HoldingRow {
                    market: h.market_id.to_string(),
                    outcome: h.outcome_id.to_string(),
                    shares: h.shares,
                    invested: h.invested,
                    avg_cost: h.average_cost,
                    price: format!("{:.4}", h.price),
                    value: h.value,
                })
                .collect();
            if !rows.is_empty() {
                render(&rows, false)?;
            }
            Ok(())
        }

        Command::Leaderboard => {
            let entries = valuator.leaderboard().await?;
            let rows: Vec<LeaderboardRow> = entries
                .iter()
                .map(|e| LeaderboardRow {
                    rank: e.rank,
                    user: e.user_id.to_string(),
                    balance: e.balance,
                    positions: e.positions_value,
                    equity: e.total_equity,
                })
                .collect();
            render(&rows, cli.json)
        }
    }
}
