//! Ledger engine integration tests: place, execute, cancel, and the economic
//! invariants. All in-memory, no database.

use bse_exchange::ledger::{self, LedgerError, OrderRequest, SharedLedger};
use bse_exchange::market::{self, SharedBrokers, SharedMarket};
use bse_exchange::types::broker::Broker;
use bse_exchange::types::instrument::Instrument;
use bse_exchange::types::order::{OrderSide, OrderStatus, OrderStyle, Qty};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn test_instrument(id: &str, symbol: &str, price: Decimal) -> Instrument {
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

fn test_broker() -> Broker {
    Broker {
        id: "stockbrokers-botswana".to_string(),
        name: "Stockbrokers Botswana".to_string(),
        description: String::new(),
        commission: dec!(2.50),
        is_active: true,
    }
}

async fn setup(starting_cash: Decimal) -> (SharedLedger, SharedMarket, SharedBrokers, Uuid) {
    let ledger_store = ledger::new_shared_ledger();
    let market_store = market::new_shared_market();
    let broker_store = market::new_shared_brokers();
    market::upsert_instrument(
        &market_store,
        test_instrument("letshego", "LETSHEGO", dec!(2.00)),
    )
    .await;
    market::upsert_broker(&broker_store, test_broker()).await;
    let user_id = Uuid::new_v4();
    ledger::create_portfolio(&ledger_store, None, user_id, "test", starting_cash)
        .await
        .unwrap();
    (ledger_store, market_store, broker_store, user_id)
}

fn req(side: OrderSide, quantity: Qty, price: Option<Decimal>) -> OrderRequest {
    OrderRequest {
        instrument_id: "letshego".to_string(),
        broker_id: "stockbrokers-botswana".to_string(),
        side,
        style: OrderStyle::Market,
        quantity,
        price,
        commission: None,
    }
}

#[tokio::test]
async fn market_buy_fills_and_updates_ledger() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(10000.00)).await;

    let order = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Buy, 1000, None),
    )
    .await
    .unwrap();

    assert_eq!(order.status, OrderStatus::Filled);
    assert_eq!(order.executed_price, Some(dec!(2.00)));
    assert_eq!(order.executed_quantity, Some(1000));
    assert_eq!(order.total_cost, dec!(2002.50));

    let portfolio = ledger::get_portfolio_for_user(&ledger_store, user_id)
        .await
        .unwrap();
    assert_eq!(portfolio.cash_balance, dec!(7997.50));

    let holdings = ledger::holdings_for_portfolio(&ledger_store, portfolio.id).await;
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].quantity, 1000);
    assert_eq!(holdings[0].average_price, dec!(2.00));
    assert_eq!(holdings[0].total_cost, dec!(2000.00));
}

#[tokio::test]
async fn sell_credits_proceeds_and_keeps_average_price() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(10000.00)).await;
    ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Buy, 1000, None),
    )
    .await
    .unwrap();

    market::apply_price(&market_store, "letshego", dec!(2.50)).await;
    let order = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Sell, 400, None),
    )
    .await
    .unwrap();
    assert_eq!(order.status, OrderStatus::Filled);

    let portfolio = ledger::get_portfolio_for_user(&ledger_store, user_id)
        .await
        .unwrap();
    // 7997.50 + (400 x 2.50 - 2.50)
    assert_eq!(portfolio.cash_balance, dec!(8995.00));

    let holdings = ledger::holdings_for_portfolio(&ledger_store, portfolio.id).await;
    assert_eq!(holdings[0].quantity, 600);
    assert_eq!(holdings[0].average_price, dec!(2.00));
    assert_eq!(holdings[0].total_cost, dec!(1200.00));
}

#[tokio::test]
async fn buy_insufficient_funds_rejected_without_state_change() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(100.00)).await;

    let err = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Buy, 1000, None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

    let portfolio = ledger::get_portfolio_for_user(&ledger_store, user_id)
        .await
        .unwrap();
    assert_eq!(portfolio.cash_balance, dec!(100.00));
    assert!(ledger::holdings_for_portfolio(&ledger_store, portfolio.id)
        .await
        .is_empty());
    assert!(ledger::orders_for_user(&ledger_store, user_id, None)
        .await
        .is_empty());
}

#[tokio::test]
async fn sell_insufficient_shares_rejected_without_state_change() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(10000.00)).await;

    // No holding at all.
    let err = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Sell, 10, None),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientShares { requested: 10, held: 0 }
    ));

    // Holding smaller than the request.
    ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Buy, 50, None),
    )
    .await
    .unwrap();
    let err = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Sell, 51, None),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientShares { requested: 51, held: 50 }
    ));
    assert_eq!(
        ledger::orders_for_user(&ledger_store, user_id, None)
            .await
            .len(),
        1
    );
}

#[tokio::test]
async fn repeat_buys_blend_weighted_average() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(10000.00)).await;

    ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Buy, 100, Some(dec!(2.00))),
    )
    .await
    .unwrap();
    ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Buy, 100, Some(dec!(3.00))),
    )
    .await
    .unwrap();

    let portfolio = ledger::get_portfolio_for_user(&ledger_store, user_id)
        .await
        .unwrap();
    let holdings = ledger::holdings_for_portfolio(&ledger_store, portfolio.id).await;
    assert_eq!(holdings[0].quantity, 200);
    assert_eq!(holdings[0].average_price, dec!(2.50));
    assert_eq!(holdings[0].total_cost, dec!(500.00));
}

#[tokio::test]
async fn full_liquidation_removes_holding() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(10000.00)).await;
    ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Buy, 100, None),
    )
    .await
    .unwrap();
    ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Sell, 100, None),
    )
    .await
    .unwrap();

    let portfolio = ledger::get_portfolio_for_user(&ledger_store, user_id)
        .await
        .unwrap();
    assert!(ledger::holdings_for_portfolio(&ledger_store, portfolio.id)
        .await
        .is_empty());
}

#[tokio::test]
async fn buy_rejects_position_size_overflow_without_state_change() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(10000.00)).await;

    // Micro-price buys keep both orders affordable while the quantities sum
    // past the holding quantity's range.
    let price = Some(dec!(0.000001));
    ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Buy, 3_000_000_000, price),
    )
    .await
    .unwrap();

    let err = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Buy, 2_000_000_000, price),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    // First fill intact, second changed nothing.
    let portfolio = ledger::get_portfolio_for_user(&ledger_store, user_id)
        .await
        .unwrap();
    assert_eq!(portfolio.cash_balance, dec!(6997.50));
    let holdings = ledger::holdings_for_portfolio(&ledger_store, portfolio.id).await;
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].quantity, 3_000_000_000);
    assert_eq!(
        holdings[0].total_cost,
        holdings[0].average_price * Decimal::from(holdings[0].quantity)
    );
    assert_eq!(
        ledger::orders_for_user(&ledger_store, user_id, None)
            .await
            .len(),
        1
    );
}

#[tokio::test]
async fn cost_basis_conservation_across_order_sequences() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(10000.00)).await;
    let commission = dec!(2.50);

    // All orders trade at an explicit 2.00 while the quoted price drifts;
    // the drift must not affect cash + cost basis.
    let sequence = [
        (OrderSide::Buy, 100u32, dec!(1.80)),
        (OrderSide::Buy, 50, dec!(2.40)),
        (OrderSide::Sell, 30, dec!(1.95)),
        (OrderSide::Sell, 120, dec!(2.10)),
    ];
    for (side, quantity, drifted_quote) in sequence {
        market::apply_price(&market_store, "letshego", drifted_quote).await;
        ledger::place_order(
            &ledger_store,
            &market_store,
            &brokers,
            None,
            user_id,
            req(side, quantity, Some(dec!(2.00))),
        )
        .await
        .unwrap();
    }

    let portfolio = ledger::get_portfolio_for_user(&ledger_store, user_id)
        .await
        .unwrap();
    let holdings = ledger::holdings_for_portfolio(&ledger_store, portfolio.id).await;
    let basis: Decimal = holdings
        .iter()
        .map(|h| h.average_price * Decimal::from(h.quantity))
        .sum();
    let commissions_paid = commission * Decimal::from(4);
    assert_eq!(
        portfolio.cash_balance + basis,
        dec!(10000.00) - commissions_paid
    );
}

#[tokio::test]
async fn limit_order_stays_pending_until_cancelled() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(10000.00)).await;

    let mut request = req(OrderSide::Buy, 100, Some(dec!(1.50)));
    request.style = OrderStyle::Limit;
    let order = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        request,
    )
    .await
    .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.price, dec!(1.50));

    // No reservation: cash and holdings untouched while pending.
    let portfolio = ledger::get_portfolio_for_user(&ledger_store, user_id)
        .await
        .unwrap();
    assert_eq!(portfolio.cash_balance, dec!(10000.00));
    assert!(ledger::holdings_for_portfolio(&ledger_store, portfolio.id)
        .await
        .is_empty());

    let cancelled = ledger::cancel_order(&ledger_store, None, order.id, user_id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    let portfolio = ledger::get_portfolio_for_user(&ledger_store, user_id)
        .await
        .unwrap();
    assert_eq!(portfolio.cash_balance, dec!(10000.00));
}

#[tokio::test]
async fn execute_fills_a_pending_limit_order() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(10000.00)).await;
    let mut request = req(OrderSide::Buy, 100, Some(dec!(1.50)));
    request.style = OrderStyle::Limit;
    let order = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        request,
    )
    .await
    .unwrap();

    let filled = ledger::execute_order(
        &ledger_store,
        &market_store,
        None,
        order.id,
        dec!(1.50),
        100,
    )
    .await
    .unwrap();
    assert_eq!(filled.status, OrderStatus::Filled);

    let portfolio = ledger::get_portfolio_for_user(&ledger_store, user_id)
        .await
        .unwrap();
    // 10000 - (100 x 1.50 + 2.50)
    assert_eq!(portfolio.cash_balance, dec!(9847.50));
    let holdings = ledger::holdings_for_portfolio(&ledger_store, portfolio.id).await;
    assert_eq!(holdings[0].average_price, dec!(1.50));
}

#[tokio::test]
async fn execute_rechecks_affordability_of_stale_pending_orders() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(200.00)).await;

    // Two pending orders that are individually affordable; no reservation
    // happens at placement, so only the first may fill.
    let mut request = req(OrderSide::Buy, 60, Some(dec!(2.00)));
    request.style = OrderStyle::Limit;
    let first = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        request.clone(),
    )
    .await
    .unwrap();
    let second = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        request,
    )
    .await
    .unwrap();

    ledger::execute_order(&ledger_store, &market_store, None, first.id, dec!(2.00), 60)
        .await
        .unwrap();
    let err = ledger::execute_order(&ledger_store, &market_store, None, second.id, dec!(2.00), 60)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

    let portfolio = ledger::get_portfolio_for_user(&ledger_store, user_id)
        .await
        .unwrap();
    assert_eq!(portfolio.cash_balance, dec!(77.50));
}

#[tokio::test]
async fn execute_rejects_terminal_and_oversized_fills() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(10000.00)).await;
    let order = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Buy, 100, None),
    )
    .await
    .unwrap();

    // Already filled.
    let err = ledger::execute_order(&ledger_store, &market_store, None, order.id, dec!(2.00), 100)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(OrderStatus::Filled)));

    // Fill beyond the requested quantity.
    let mut request = req(OrderSide::Buy, 10, Some(dec!(2.00)));
    request.style = OrderStyle::Limit;
    let pending = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        request,
    )
    .await
    .unwrap();
    let err = ledger::execute_order(&ledger_store, &market_store, None, pending.id, dec!(2.00), 11)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn cancel_enforces_ownership_and_state() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(10000.00)).await;
    let stranger = Uuid::new_v4();

    let err = ledger::cancel_order(&ledger_store, None, Uuid::new_v4(), user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound("order")));

    let mut request = req(OrderSide::Buy, 10, Some(dec!(1.00)));
    request.style = OrderStyle::Limit;
    let order = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        request,
    )
    .await
    .unwrap();

    let err = ledger::cancel_order(&ledger_store, None, order.id, stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden));

    ledger::cancel_order(&ledger_store, None, order.id, user_id)
        .await
        .unwrap();
    let err = ledger::cancel_order(&ledger_store, None, order.id, user_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidState(OrderStatus::Cancelled)
    ));

    // Filled orders are terminal too.
    let filled = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Buy, 10, None),
    )
    .await
    .unwrap();
    let err = ledger::cancel_order(&ledger_store, None, filled.id, user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(OrderStatus::Filled)));
}

#[tokio::test]
async fn rejects_malformed_requests() {
    let (ledger_store, market_store, brokers, user_id) = setup(dec!(10000.00)).await;

    let err = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        req(OrderSide::Buy, 0, None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let mut bad_instrument = req(OrderSide::Buy, 10, None);
    bad_instrument.instrument_id = "nope".to_string();
    let err = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        bad_instrument,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let mut bad_broker = req(OrderSide::Buy, 10, None);
    bad_broker.broker_id = "nope".to_string();
    let err = ledger::place_order(
        &ledger_store,
        &market_store,
        &brokers,
        None,
        user_id,
        bad_broker,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}
