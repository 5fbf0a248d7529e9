//! Valuation tests: derived views over holdings and current prices.

use std::collections::HashMap;

use bse_exchange::ledger::valuation::{cost_basis, market_value, portfolio_valuation, unrealized_pl};
use bse_exchange::ledger::{self, OrderRequest};
use bse_exchange::market;
use bse_exchange::types::broker::Broker;
use bse_exchange::types::instrument::Instrument;
use bse_exchange::types::order::{OrderSide, OrderStyle};
use bse_exchange::types::portfolio::Holding;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn holding(instrument_id: &str, quantity: u32, average_price: Decimal) -> Holding {
    Holding {
        portfolio_id: Uuid::new_v4(),
        instrument_id: instrument_id.to_string(),
        quantity,
        average_price,
        total_cost: average_price * Decimal::from(quantity),
    }
}

#[test]
fn market_value_sums_quantity_times_price() {
    let holdings = vec![holding("fnb", 100, dec!(5.00)), holding("engen", 10, dec!(14.00))];
    let prices = HashMap::from([
        ("fnb".to_string(), dec!(5.30)),
        ("engen".to_string(), dec!(14.25)),
    ]);
    assert_eq!(market_value(&holdings, &prices), dec!(672.50));
    assert_eq!(cost_basis(&holdings), dec!(640.00));
    assert_eq!(unrealized_pl(&holdings, &prices), dec!(32.50));
}

#[test]
fn unknown_price_contributes_zero() {
    let holdings = vec![holding("fnb", 100, dec!(5.00))];
    let prices = HashMap::new();
    assert_eq!(market_value(&holdings, &prices), Decimal::ZERO);
    assert_eq!(unrealized_pl(&holdings, &prices), dec!(-500.00));
}

#[tokio::test]
async fn portfolio_valuation_tracks_price_drift() {
    let ledger_store = ledger::new_shared_ledger();
    let market_store = market::new_shared_market();
    let broker_store = market::new_shared_brokers();
    market::upsert_instrument(
        &market_store,
        Instrument {
            id: "chobe".to_string(),
            symbol: "CHOBE".to_string(),
            name: "Chobe Holdings Limited".to_string(),
            sector: "Consumer Services".to_string(),
            current_price: dec!(10.00),
            previous_close: dec!(10.00),
            market_cap: dec!(3_400_000_000),
            pe_ratio: dec!(15.2),
            dividend_yield: dec!(3.1),
            is_active: true,
        },
    )
    .await;
    market::upsert_broker(
        &broker_store,
        Broker {
            id: "motswedi-securities".to_string(),
            name: "Motswedi Securities".to_string(),
            description: String::new(),
            commission: dec!(2.50),
            is_active: true,
        },
    )
    .await;
    let user_id = Uuid::new_v4();
    ledger::create_portfolio(&ledger_store, None, user_id, "test", dec!(1000.00))
        .await
        .unwrap();
    ledger::place_order(
        &ledger_store,
        &market_store,
        &broker_store,
        None,
        user_id,
        OrderRequest {
            instrument_id: "chobe".to_string(),
            broker_id: "motswedi-securities".to_string(),
            side: OrderSide::Buy,
            style: OrderStyle::Market,
            quantity: 50,
            price: None,
            commission: None,
        },
    )
    .await
    .unwrap();

    let portfolio = ledger::get_portfolio_for_user(&ledger_store, user_id)
        .await
        .unwrap();
    // cash: 1000 - (500 + 2.50)
    assert_eq!(portfolio.cash_balance, dec!(497.50));

    market::apply_price(&market_store, "chobe", dec!(12.00)).await;
    let valuation = portfolio_valuation(
        &ledger_store,
        &market_store,
        portfolio.id,
        portfolio.cash_balance,
    )
    .await;
    assert_eq!(valuation.market_value, dec!(600.00));
    assert_eq!(valuation.total_value, dec!(1097.50));
    assert_eq!(valuation.cost_basis, dec!(500.00));
    assert_eq!(valuation.unrealized_pl, dec!(100.00));
}
