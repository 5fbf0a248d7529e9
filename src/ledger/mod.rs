//! Ledger engine: order placement, execution, and cancellation with the
//! economic invariants enforced. A user cannot spend cash or sell shares they
//! do not have, and every fill leaves holdings and cash consistent.
//!
//! All mutations run under a single writer lock over the ledger state, so
//! concurrent orders against the same portfolio can never both pass a stale
//! affordability check. When a DB pool is configured, a fill is committed in
//! one transaction before the in-memory state is touched; a failed commit
//! changes nothing anywhere.

mod error;
pub mod valuation;

pub use error::LedgerError;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::market::{self, SharedBrokers, SharedMarket};
use crate::persistence;
use crate::types::order::{Order, OrderId, OrderSide, OrderStatus, OrderStyle, Qty};
use crate::types::portfolio::{Holding, Portfolio};

type HoldingKey = (Uuid, String);

#[derive(Default)]
pub struct LedgerState {
    portfolios: HashMap<Uuid, Portfolio>,
    by_user: HashMap<Uuid, Uuid>,
    holdings: HashMap<HoldingKey, Holding>,
    orders: HashMap<OrderId, Order>,
}

pub type SharedLedger = Arc<RwLock<LedgerState>>;

pub fn new_shared_ledger() -> SharedLedger {
    Arc::new(RwLock::new(LedgerState::default()))
}

/// Typed order request, validated before anything is created.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    pub instrument_id: String,
    pub broker_id: String,
    pub side: OrderSide,
    #[serde(default)]
    pub style: OrderStyle,
    pub quantity: Qty,
    /// Limit price; None means "use the current instrument price".
    pub price: Option<Decimal>,
    /// Override for the broker's flat fee.
    pub commission: Option<Decimal>,
}

/// The post-fill shape of the touched holding: updated, or removed because
/// the position was fully liquidated.
enum HoldingChange {
    Upsert(Holding),
    Delete(HoldingKey),
}

/// Validate and create an order. Market orders are filled synchronously in
/// the same critical section; Limit/StopLoss orders stay Pending (no
/// price-crossing trigger is modelled) until executed or cancelled.
///
/// A failed placement creates no order and changes no state.
pub async fn place_order(
    ledger: &SharedLedger,
    market: &SharedMarket,
    brokers: &SharedBrokers,
    db: Option<&PgPool>,
    user_id: Uuid,
    req: OrderRequest,
) -> Result<Order, LedgerError> {
    if req.quantity == 0 {
        return Err(LedgerError::Validation("quantity must be positive".into()));
    }
    if req.price.is_some_and(|p| p <= Decimal::ZERO) {
        return Err(LedgerError::Validation("limit price must be positive".into()));
    }
    if req.commission.is_some_and(|c| c < Decimal::ZERO) {
        return Err(LedgerError::Validation("commission must not be negative".into()));
    }

    let broker = market::get_broker(brokers, &req.broker_id)
        .await
        .filter(|b| b.is_active)
        .ok_or_else(|| LedgerError::Validation(format!("unknown broker {}", req.broker_id)))?;
    let instrument = market::get_instrument(market, &req.instrument_id)
        .await
        .filter(|i| i.is_active)
        .ok_or_else(|| {
            LedgerError::Validation(format!("unknown instrument {}", req.instrument_id))
        })?;

    let price = req.price.unwrap_or(instrument.current_price);
    let commission = req.commission.unwrap_or(broker.commission);
    let total_cost = price * Decimal::from(req.quantity) + commission;

    let mut guard = ledger.write().await;
    let portfolio_id = *guard
        .by_user
        .get(&user_id)
        .ok_or(LedgerError::NotFound("portfolio"))?;
    let portfolio = guard
        .portfolios
        .get(&portfolio_id)
        .ok_or(LedgerError::NotFound("portfolio"))?;

    match req.side {
        OrderSide::Buy => {
            if portfolio.cash_balance < total_cost {
                return Err(LedgerError::InsufficientFunds {
                    required: total_cost,
                    available: portfolio.cash_balance,
                });
            }
        }
        OrderSide::Sell => {
            let held = guard
                .holdings
                .get(&(portfolio_id, req.instrument_id.clone()))
                .map(|h| h.quantity)
                .unwrap_or(0);
            if held < req.quantity {
                return Err(LedgerError::InsufficientShares {
                    requested: req.quantity,
                    held,
                });
            }
        }
    }

    let order = Order {
        id: Uuid::new_v4(),
        user_id,
        portfolio_id,
        instrument_id: req.instrument_id,
        broker_id: req.broker_id,
        side: req.side,
        style: req.style,
        quantity: req.quantity,
        price,
        executed_price: None,
        executed_quantity: None,
        status: OrderStatus::Pending,
        total_cost,
        commission,
        created_at: Utc::now(),
        executed_at: None,
    };

    if order.style == OrderStyle::Market {
        let quantity = order.quantity;
        return fill_locked(&mut guard, market, db, order, price, quantity).await;
    }

    // Limit/StopLoss: persist Pending, no auto-trigger.
    if let Some(pool) = db {
        persistence::insert_order(pool, &order).await?;
    }
    guard.orders.insert(order.id, order.clone());
    tracing::info!(
        order_id = %order.id,
        style = ?order.style,
        "order accepted, pending"
    );
    Ok(order)
}

/// Fill an order at the given price and quantity. The order must exist and be
/// non-terminal; a fill never exceeds the requested quantity.
pub async fn execute_order(
    ledger: &SharedLedger,
    market: &SharedMarket,
    db: Option<&PgPool>,
    order_id: OrderId,
    executed_price: Decimal,
    executed_quantity: Qty,
) -> Result<Order, LedgerError> {
    if executed_quantity == 0 {
        return Err(LedgerError::Validation(
            "executed quantity must be positive".into(),
        ));
    }
    if executed_price <= Decimal::ZERO {
        return Err(LedgerError::Validation(
            "executed price must be positive".into(),
        ));
    }

    let mut guard = ledger.write().await;
    let order = guard
        .orders
        .get(&order_id)
        .cloned()
        .ok_or(LedgerError::NotFound("order"))?;
    if order.status.is_terminal() {
        return Err(LedgerError::InvalidState(order.status));
    }
    if executed_quantity > order.quantity {
        return Err(LedgerError::Validation(
            "executed quantity exceeds order quantity".into(),
        ));
    }

    fill_locked(&mut guard, market, db, order, executed_price, executed_quantity).await
}

/// Cancel a Pending order. No ledger mutation: funds and shares are never
/// reserved ahead of execution.
pub async fn cancel_order(
    ledger: &SharedLedger,
    db: Option<&PgPool>,
    order_id: OrderId,
    user_id: Uuid,
) -> Result<Order, LedgerError> {
    let mut guard = ledger.write().await;
    let mut order = guard
        .orders
        .get(&order_id)
        .cloned()
        .ok_or(LedgerError::NotFound("order"))?;
    if order.user_id != user_id {
        return Err(LedgerError::Forbidden);
    }
    if order.status != OrderStatus::Pending {
        return Err(LedgerError::InvalidState(order.status));
    }

    order.status = OrderStatus::Cancelled;
    if let Some(pool) = db {
        persistence::update_order_status(pool, order.id, order.status).await?;
    }
    guard.orders.insert(order.id, order.clone());
    tracing::info!(order_id = %order.id, "order cancelled");
    Ok(order)
}

/// Apply a fill under an already-held write lock: holding update, cash leg,
/// aggregate refresh, DB commit. The in-memory state is only touched after a
/// successful commit, so a persistence failure leaves no partial state.
async fn fill_locked(
    state: &mut LedgerState,
    market: &SharedMarket,
    db: Option<&PgPool>,
    mut order: Order,
    executed_price: Decimal,
    executed_quantity: Qty,
) -> Result<Order, LedgerError> {
    let Some(portfolio) = state.portfolios.get(&order.portfolio_id) else {
        tracing::warn!(order_id = %order.id, "fill aborted: owning portfolio missing");
        return Err(LedgerError::NotFound("portfolio"));
    };
    let mut portfolio = portfolio.clone();
    let key = (order.portfolio_id, order.instrument_id.clone());
    let executed_qty_dec = Decimal::from(executed_quantity);

    let change = match order.side {
        OrderSide::Buy => {
            // The recorded order total is the single source of truth for the
            // BUY cash leg. Re-check affordability: the order may have been
            // placed earlier against a balance that has since moved.
            if portfolio.cash_balance < order.total_cost {
                return Err(LedgerError::InsufficientFunds {
                    required: order.total_cost,
                    available: portfolio.cash_balance,
                });
            }
            portfolio.cash_balance -= order.total_cost;

            let holding = match state.holdings.get(&key) {
                Some(existing) => {
                    // Checked: two affordable micro-price buys can sum past
                    // the quantity type's range.
                    let quantity = existing
                        .quantity
                        .checked_add(executed_quantity)
                        .ok_or_else(|| {
                            LedgerError::Validation(
                                "position size exceeds the supported maximum".into(),
                            )
                        })?;
                    let total_cost = existing.total_cost + executed_price * executed_qty_dec;
                    Holding {
                        portfolio_id: key.0,
                        instrument_id: key.1.clone(),
                        quantity,
                        average_price: total_cost / Decimal::from(quantity),
                        total_cost,
                    }
                }
                None => Holding {
                    portfolio_id: key.0,
                    instrument_id: key.1.clone(),
                    quantity: executed_quantity,
                    average_price: executed_price,
                    total_cost: executed_price * executed_qty_dec,
                },
            };
            HoldingChange::Upsert(holding)
        }
        OrderSide::Sell => {
            let existing = state
                .holdings
                .get(&key)
                .ok_or(LedgerError::InsufficientShares {
                    requested: executed_quantity,
                    held: 0,
                })?;
            if existing.quantity < executed_quantity {
                return Err(LedgerError::InsufficientShares {
                    requested: executed_quantity,
                    held: existing.quantity,
                });
            }
            let proceeds = executed_price * executed_qty_dec - order.commission;
            portfolio.cash_balance += proceeds;

            let quantity = existing.quantity - executed_quantity;
            if quantity == 0 {
                // Full liquidation removes the holding.
                HoldingChange::Delete(key.clone())
            } else {
                // Cost basis of the remaining shares is unchanged: weighted
                // average moves on buys only.
                HoldingChange::Upsert(Holding {
                    portfolio_id: key.0,
                    instrument_id: key.1.clone(),
                    quantity,
                    average_price: existing.average_price,
                    total_cost: existing.average_price * Decimal::from(quantity),
                })
            }
        }
    };

    order.status = OrderStatus::Filled;
    order.executed_price = Some(executed_price);
    order.executed_quantity = Some(executed_quantity);
    order.executed_at = Some(Utc::now());

    // Refresh the cached aggregates from the post-fill holdings.
    let (total_value, total_cost) =
        aggregates_after(state, market, order.portfolio_id, &key, &change).await;
    portfolio.total_value = total_value;
    portfolio.total_cost = total_cost;

    if let Some(pool) = db {
        persistence::commit_fill(pool, &order, &portfolio, holding_row(&change)).await?;
    }

    state.orders.insert(order.id, order.clone());
    match change {
        HoldingChange::Upsert(holding) => {
            state.holdings.insert(key, holding);
        }
        HoldingChange::Delete(key) => {
            state.holdings.remove(&key);
        }
    }
    state.portfolios.insert(portfolio.id, portfolio);

    tracing::info!(
        order_id = %order.id,
        side = ?order.side,
        instrument = %order.instrument_id,
        price = %executed_price,
        quantity = executed_quantity,
        "order filled"
    );
    Ok(order)
}

fn holding_row(change: &HoldingChange) -> persistence::HoldingWrite<'_> {
    match change {
        HoldingChange::Upsert(holding) => persistence::HoldingWrite::Upsert(holding),
        HoldingChange::Delete((portfolio_id, instrument_id)) => {
            persistence::HoldingWrite::Delete {
                portfolio_id: *portfolio_id,
                instrument_id,
            }
        }
    }
}

/// Portfolio aggregates (market value of holdings, summed cost basis) as they
/// will stand once `change` is applied.
async fn aggregates_after(
    state: &LedgerState,
    market: &SharedMarket,
    portfolio_id: Uuid,
    touched: &HoldingKey,
    change: &HoldingChange,
) -> (Decimal, Decimal) {
    let mut holdings: Vec<Holding> = state
        .holdings
        .iter()
        .filter(|(key, _)| key.0 == portfolio_id && *key != touched)
        .map(|(_, h)| h.clone())
        .collect();
    if let HoldingChange::Upsert(holding) = change {
        holdings.push(holding.clone());
    }

    let mut prices = HashMap::new();
    for holding in &holdings {
        if let Some(instrument) = market::get_instrument(market, &holding.instrument_id).await {
            prices.insert(holding.instrument_id.clone(), instrument.current_price);
        }
    }
    (
        valuation::market_value(&holdings, &prices),
        valuation::cost_basis(&holdings),
    )
}

/// Create a portfolio for a new user. Persisted first when a DB is configured.
pub async fn create_portfolio(
    ledger: &SharedLedger,
    db: Option<&PgPool>,
    user_id: Uuid,
    name: &str,
    starting_cash: Decimal,
) -> Result<Portfolio, LedgerError> {
    let portfolio = Portfolio {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_string(),
        cash_balance: starting_cash,
        total_value: Decimal::ZERO,
        total_cost: Decimal::ZERO,
        created_at: Utc::now(),
    };
    if let Some(pool) = db {
        persistence::insert_portfolio(pool, &portfolio).await?;
    }
    let mut guard = ledger.write().await;
    guard.by_user.insert(user_id, portfolio.id);
    guard.portfolios.insert(portfolio.id, portfolio.clone());
    Ok(portfolio)
}

pub async fn get_portfolio_for_user(ledger: &SharedLedger, user_id: Uuid) -> Option<Portfolio> {
    let guard = ledger.read().await;
    let id = guard.by_user.get(&user_id)?;
    guard.portfolios.get(id).cloned()
}

pub async fn holdings_for_portfolio(ledger: &SharedLedger, portfolio_id: Uuid) -> Vec<Holding> {
    let guard = ledger.read().await;
    let mut out: Vec<Holding> = guard
        .holdings
        .iter()
        .filter(|(key, _)| key.0 == portfolio_id)
        .map(|(_, h)| h.clone())
        .collect();
    out.sort_by(|a, b| a.instrument_id.cmp(&b.instrument_id));
    out
}

pub async fn get_order(ledger: &SharedLedger, order_id: OrderId) -> Option<Order> {
    let guard = ledger.read().await;
    guard.orders.get(&order_id).cloned()
}

/// A user's orders, newest first, optionally filtered by status.
pub async fn orders_for_user(
    ledger: &SharedLedger,
    user_id: Uuid,
    status: Option<OrderStatus>,
) -> Vec<Order> {
    let guard = ledger.read().await;
    let mut out: Vec<Order> = guard
        .orders
        .values()
        .filter(|o| o.user_id == user_id && status.is_none_or(|s| o.status == s))
        .cloned()
        .collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

/// Memory-only inserts: startup hydration, and the apply step after a
/// registration has committed.
pub async fn load_portfolio(ledger: &SharedLedger, portfolio: Portfolio) {
    let mut guard = ledger.write().await;
    guard.by_user.insert(portfolio.user_id, portfolio.id);
    guard.portfolios.insert(portfolio.id, portfolio);
}

pub async fn load_holding(ledger: &SharedLedger, holding: Holding) {
    let mut guard = ledger.write().await;
    guard
        .holdings
        .insert((holding.portfolio_id, holding.instrument_id.clone()), holding);
}

pub async fn load_order(ledger: &SharedLedger, order: Order) {
    let mut guard = ledger.write().await;
    guard.orders.insert(order.id, order);
}
