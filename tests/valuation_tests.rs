//! Read-side integration tests: market quotes, portfolio valuation
//! across market lifecycles, and deterministic leaderboard ordering.

mod support;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use oddsmill::domain::MarketStatus;
use support::{no, yes, Exchange};

#[tokio::test]
async fn fresh_markets_quote_uniform_prices_and_zero_volume() {
    let ex = Exchange::in_memory();
    ex.seed_yes_no("m1", 100.0).await;
    let market = ex.seed_market("m2", &["a", "b", "c", "d"], 50.0).await;

    let quotes = ex.valuator.list_markets().await.unwrap();
    assert_eq!(quotes.len(), 2);

    for quote in &quotes {
        assert_eq!(quote.volume, Decimal::ZERO);
        let n = quote.outcomes.len() as f64;
        for outcome in &quote.outcomes {
            assert!((outcome.price - 1.0 / n).abs() < 1e-9);
            assert_eq!(outcome.quantity, Decimal::ZERO);
        }
    }

    let four_way = ex.valuator.market_quote(&market).await.unwrap();
    assert_eq!(four_way.outcomes.len(), 4);
    let sum: f64 = four_way.outcomes.iter().map(|o| o.price).sum();
    assert!((sum - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn quotes_track_orders_and_volume() {
    let ex = Exchange::in_memory();
    let alice = ex.seed_user("alice", dec!(1000)).await;
    let market = ex.seed_yes_no("m1", 100.0).await;

    let fill = ex
        .executor
        .place_buy(&market, &alice, &yes(), dec!(10))
        .await
        .unwrap();

    let quote = ex.valuator.market_quote(&market).await.unwrap();
    assert_eq!(quote.status, MarketStatus::Open);
    assert_eq!(quote.volume, fill.cost);

    let yes_quote = &quote.outcomes[0];
    let no_quote = &quote.outcomes[1];
    assert_eq!(yes_quote.quantity, dec!(10));
    assert_eq!(no_quote.quantity, Decimal::ZERO);
    assert!(yes_quote.price > 0.5);
    assert!((yes_quote.price + no_quote.price - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn resolved_markets_quote_unit_and_zero_prices() {
    let ex = Exchange::in_memory();
    let alice = ex.seed_user("alice", dec!(1000)).await;
    let market = ex.seed_yes_no("m1", 100.0).await;
    ex.executor
        .place_buy(&market, &alice, &no(), dec!(10))
        .await
        .unwrap();

    ex.settlement.resolve(&market, &no()).await.unwrap();

    let quote = ex.valuator.market_quote(&market).await.unwrap();
    assert_eq!(quote.status, MarketStatus::Resolved);
    assert_eq!(quote.winner, Some(no()));
    assert_eq!(quote.outcomes[0].price, 0.0);
    assert_eq!(quote.outcomes[1].price, 1.0);
}

#[tokio::test]
async fn open_positions_are_valued_at_live_prices() {
    let ex = Exchange::in_memory();
    let alice = ex.seed_user("alice", dec!(1000)).await;
    let market = ex.seed_yes_no("m1", 100.0).await;

    let fill = ex
        .executor
        .place_buy(&market, &alice, &yes(), dec!(10))
        .await
        .unwrap();

    let quote = ex.valuator.market_quote(&market).await.unwrap();
    let live_price = quote.outcomes[0].price;

    let portfolio = ex.valuator.portfolio(&alice).await.unwrap();
    assert_eq!(portfolio.balance, dec!(1000) - fill.cost);
    assert_eq!(portfolio.holdings.len(), 1);

    let holding = &portfolio.holdings[0];
    assert_eq!(holding.price, live_price);
    let expected = (dec!(10) * Decimal::from_f64(live_price).unwrap()).round_dp(4);
    assert_eq!(holding.value, expected);
    assert_eq!(holding.average_cost, (fill.cost / dec!(10)).round_dp(4));
    assert_eq!(portfolio.positions_value, holding.value);
    assert_eq!(
        portfolio.total_equity,
        portfolio.balance + portfolio.positions_value
    );
}

#[tokio::test]
async fn resolved_positions_are_valued_at_settlement_prices() {
    let ex = Exchange::in_memory();
    let alice = ex.seed_user("alice", dec!(1000)).await;
    let bob = ex.seed_user("bob", dec!(1000)).await;
    let market = ex.seed_yes_no("m1", 100.0).await;

    ex.executor
        .place_buy(&market, &alice, &yes(), dec!(10))
        .await
        .unwrap();
    ex.executor
        .place_buy(&market, &bob, &no(), dec!(10))
        .await
        .unwrap();
    ex.settlement.resolve(&market, &yes()).await.unwrap();

    let winner = ex.valuator.portfolio(&alice).await.unwrap();
    assert_eq!(winner.holdings[0].price, 1.0);
    assert_eq!(winner.holdings[0].value, dec!(10).round_dp(4));

    let loser = ex.valuator.portfolio(&bob).await.unwrap();
    assert_eq!(loser.holdings[0].price, 0.0);
    assert_eq!(loser.holdings[0].value, Decimal::ZERO.round_dp(4));
}

#[tokio::test]
async fn archived_positions_are_worthless() {
    let ex = Exchange::in_memory();
    let alice = ex.seed_user("alice", dec!(1000)).await;
    let market = ex.seed_yes_no("m1", 100.0).await;
    ex.executor
        .place_buy(&market, &alice, &yes(), dec!(10))
        .await
        .unwrap();

    ex.ledger.archive_market(&market).await.unwrap();

    let portfolio = ex.valuator.portfolio(&alice).await.unwrap();
    assert_eq!(portfolio.holdings[0].price, 0.0);
    assert_eq!(portfolio.positions_value, Decimal::ZERO.round_dp(4));
    assert_eq!(portfolio.total_equity, portfolio.balance);
}

#[tokio::test]
async fn leaderboard_ranks_by_equity_with_stable_ties() {
    let ex = Exchange::in_memory();
    ex.seed_user("carol", dec!(500)).await;
    ex.seed_user("alice", dec!(500)).await;
    let bob = ex.seed_user("bob", dec!(2000)).await;
    let market = ex.seed_yes_no("m1", 100.0).await;

    // Bob converts some balance into shares; equity moves by the spread
    // between price paid and live value, not by the stake itself.
    ex.executor
        .place_buy(&market, &bob, &yes(), dec!(10))
        .await
        .unwrap();

    let entries = ex.valuator.leaderboard().await.unwrap();
    let order: Vec<_> = entries
        .iter()
        .map(|e| (e.rank, e.user_id.as_str().to_string()))
        .collect();

    // Bob leads on equity; alice and carol tie at 500 and break by id.
    assert_eq!(order[0].1, "bob");
    assert_eq!(
        &order[1..],
        &[(2, "alice".to_string()), (3, "carol".to_string())]
    );

    let bob_entry = &entries[0];
    assert_eq!(
        bob_entry.total_equity,
        bob_entry.balance + bob_entry.positions_value
    );
    assert!(bob_entry.positions_value > Decimal::ZERO);

    // Same inputs, same ranking.
    let again = ex.valuator.leaderboard().await.unwrap();
    assert_eq!(entries, again);
}

#[tokio::test]
async fn leaderboard_reflects_settlement_transfers() {
    let ex = Exchange::in_memory();
    let alice = ex.seed_user("alice", dec!(1000)).await;
    let bob = ex.seed_user("bob", dec!(1000)).await;
    let market = ex.seed_yes_no("m1", 100.0).await;

    ex.executor
        .place_buy(&market, &alice, &yes(), dec!(50))
        .await
        .unwrap();
    ex.executor
        .place_buy(&market, &bob, &no(), dec!(50))
        .await
        .unwrap();
    ex.settlement.resolve(&market, &yes()).await.unwrap();

    let entries = ex.valuator.leaderboard().await.unwrap();
    assert_eq!(entries[0].user_id, alice);
    assert_eq!(entries[1].user_id, bob);
    assert!(entries[0].total_equity > entries[1].total_equity);
    // Bob's losing position carries no value.
    assert_eq!(entries[1].positions_value.to_f64().unwrap(), 0.0);
}
