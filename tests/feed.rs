//! Price feed tests: bounded movement, price floor, history, broadcast.

use bse_exchange::feed::{self, PriceUpdate};
use bse_exchange::market;
use bse_exchange::types::instrument::Instrument;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::broadcast;

fn instrument(id: &str, symbol: &str, price: Decimal) -> Instrument {
    Instrument {
        id: id.to_string(),
        symbol: symbol.to_string(),
        name: format!("{symbol} Limited"),
        sector: "Financials".to_string(),
        current_price: price,
        previous_close: price,
        market_cap: dec!(1_000_000_000),
        pe_ratio: dec!(10.0),
        dividend_yield: dec!(3.0),
        is_active: true,
    }
}

#[tokio::test]
async fn tick_moves_prices_within_bounds() {
    let market_store = market::new_shared_market();
    market::upsert_instrument(&market_store, instrument("fnb", "FNB", dec!(5.30))).await;
    let (tx, _rx) = broadcast::channel(64);

    let mut previous = dec!(5.30);
    for _ in 0..50 {
        feed::tick_prices(&market_store, None, &tx).await;
        let current = market::get_instrument(&market_store, "fnb")
            .await
            .unwrap()
            .current_price;
        let lower = (previous * dec!(0.98)).round_dp(3) - dec!(0.001);
        let upper = (previous * dec!(1.02)).round_dp(3) + dec!(0.001);
        assert!(current >= lower && current <= upper, "{current} outside [{lower}, {upper}]");
        previous = current;
    }
}

#[tokio::test]
async fn tick_never_drops_below_floor() {
    let market_store = market::new_shared_market();
    market::upsert_instrument(&market_store, instrument("penny", "PENNY", dec!(0.01))).await;
    let (tx, _rx) = broadcast::channel(64);

    for _ in 0..100 {
        feed::tick_prices(&market_store, None, &tx).await;
        let price = market::get_instrument(&market_store, "penny")
            .await
            .unwrap()
            .current_price;
        assert!(price >= dec!(0.01));
    }
}

#[tokio::test]
async fn tick_appends_history_most_recent_first() {
    let market_store = market::new_shared_market();
    market::upsert_instrument(&market_store, instrument("fnb", "FNB", dec!(5.30))).await;
    let (tx, _rx) = broadcast::channel(64);

    for _ in 0..3 {
        feed::tick_prices(&market_store, None, &tx).await;
    }
    let history = market::price_history(&market_store, "fnb", 50).await;
    assert_eq!(history.len(), 3);
    assert!(history[0].timestamp >= history[1].timestamp);
    assert!(history[1].timestamp >= history[2].timestamp);
    let current = market::get_instrument(&market_store, "fnb")
        .await
        .unwrap()
        .current_price;
    assert_eq!(history[0].price, current);

    let limited = market::price_history(&market_store, "fnb", 2).await;
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn tick_broadcasts_updates_to_subscribers() {
    let market_store = market::new_shared_market();
    market::upsert_instrument(&market_store, instrument("fnb", "FNB", dec!(5.30))).await;
    market::upsert_instrument(&market_store, instrument("absa", "ABSA", dec!(7.30))).await;
    let (tx, mut rx) = broadcast::channel(64);

    feed::tick_prices(&market_store, None, &tx).await;

    let mut updates: Vec<PriceUpdate> = Vec::new();
    for _ in 0..2 {
        updates.push(rx.recv().await.unwrap());
    }
    let mut symbols: Vec<String> = updates.iter().map(|u| u.symbol.clone()).collect();
    symbols.sort();
    assert_eq!(symbols, vec!["ABSA".to_string(), "FNB".to_string()]);
    for update in &updates {
        assert!(update.change_percent.abs() <= dec!(2.1));
        let quoted = market::get_instrument(&market_store, if update.symbol == "FNB" { "fnb" } else { "absa" })
            .await
            .unwrap()
            .current_price;
        assert_eq!(update.price, quoted);
    }
}

#[tokio::test]
async fn inactive_instruments_do_not_tick() {
    let market_store = market::new_shared_market();
    let mut delisted = instrument("delisted", "GONE", dec!(3.00));
    delisted.is_active = false;
    market::upsert_instrument(&market_store, delisted).await;
    let (tx, _rx) = broadcast::channel(64);

    feed::tick_prices(&market_store, None, &tx).await;

    let price = market::get_instrument(&market_store, "delisted")
        .await
        .unwrap()
        .current_price;
    assert_eq!(price, dec!(3.00));
    assert!(market::price_history(&market_store, "delisted", 10)
        .await
        .is_empty());
}
