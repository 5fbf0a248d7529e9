//! Database layer: pool, migrations, per-entity access, and the one
//! transaction that commits a fill atomically. The in-memory state is the
//! source of truth at runtime; the DB provides durability and hydration.

mod brokers;
mod history;
mod holdings;
mod instruments;
mod orders;
mod pool;
mod portfolios;
mod users;

pub use brokers::{broker_row_to_broker, list_brokers, upsert_broker, BrokerRow};
pub use history::{
    insert_price_point, list_price_history, price_point_row_to_point, PricePointRow,
};
pub use holdings::{holding_row_to_holding, list_holdings, HoldingRow};
pub use instruments::{
    instrument_row_to_instrument, list_instruments, update_instrument_price, upsert_instrument,
    InstrumentRow,
};
pub use orders::{
    insert_order, list_orders, order_row_to_order, update_order_status, OrderRow,
};
pub use pool::create_pool_and_migrate;
pub use portfolios::{insert_portfolio, list_portfolios, portfolio_row_to_portfolio, PortfolioRow};
pub use sqlx::PgPool;
pub use users::{list_users, UserRow};

use uuid::Uuid;

use crate::types::order::Order;
use crate::types::portfolio::{Holding, Portfolio};

/// Holding write inside a fill: updated row, or removal on full liquidation.
pub enum HoldingWrite<'a> {
    Upsert(&'a Holding),
    Delete {
        portfolio_id: Uuid,
        instrument_id: &'a str,
    },
}

/// Commit a registration in one transaction: the user row and their starting
/// portfolio. All-or-nothing, so a failed registration leaves no user row
/// behind to collide with a retry of the same name.
pub async fn commit_registration(
    pool: &PgPool,
    user_id: Uuid,
    username: &str,
    password_hash: &str,
    portfolio: &Portfolio,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(username)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO portfolios (id, user_id, name, cash_balance, total_value, total_cost, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(portfolio.id)
    .bind(portfolio.user_id)
    .bind(&portfolio.name)
    .bind(portfolio.cash_balance)
    .bind(portfolio.total_value)
    .bind(portfolio.total_cost)
    .bind(portfolio.created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// Commit a fill in one transaction: order row (inserted for market orders,
/// updated for fills of previously pending rows), holding upsert/delete, and
/// the portfolio's cash balance and cached aggregates. All-or-nothing: a
/// failure here must leave the DB exactly as it was.
pub async fn commit_fill(
    pool: &PgPool,
    order: &Order,
    portfolio: &Portfolio,
    holding: HoldingWrite<'_>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO orders \
           (id, user_id, portfolio_id, instrument_id, broker_id, side, style, quantity, price, \
            executed_price, executed_quantity, status, total_cost, commission, created_at, executed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
         ON CONFLICT (id) DO UPDATE SET \
           executed_price = $10, executed_quantity = $11, status = $12, executed_at = $16",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.portfolio_id)
    .bind(&order.instrument_id)
    .bind(&order.broker_id)
    .bind(orders::side_to_str(order.side))
    .bind(orders::style_to_str(order.style))
    .bind(i64::from(order.quantity))
    .bind(order.price)
    .bind(order.executed_price)
    .bind(order.executed_quantity.map(i64::from))
    .bind(orders::status_to_str(order.status))
    .bind(order.total_cost)
    .bind(order.commission)
    .bind(order.created_at)
    .bind(order.executed_at)
    .execute(&mut *tx)
    .await?;

    match holding {
        HoldingWrite::Upsert(h) => {
            sqlx::query(
                "INSERT INTO holdings (portfolio_id, instrument_id, quantity, average_price, total_cost) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (portfolio_id, instrument_id) DO UPDATE SET \
                   quantity = $3, average_price = $4, total_cost = $5",
            )
            .bind(h.portfolio_id)
            .bind(&h.instrument_id)
            .bind(i64::from(h.quantity))
            .bind(h.average_price)
            .bind(h.total_cost)
            .execute(&mut *tx)
            .await?;
        }
        HoldingWrite::Delete {
            portfolio_id,
            instrument_id,
        } => {
            sqlx::query("DELETE FROM holdings WHERE portfolio_id = $1 AND instrument_id = $2")
                .bind(portfolio_id)
                .bind(instrument_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    sqlx::query(
        "UPDATE portfolios SET cash_balance = $1, total_value = $2, total_cost = $3 WHERE id = $4",
    )
    .bind(portfolio.cash_balance)
    .bind(portfolio.total_value)
    .bind(portfolio.total_cost)
    .bind(portfolio.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}
