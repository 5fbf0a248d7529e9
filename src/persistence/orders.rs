//! Order persistence: insert on placement, status updates, hydration.
//! Fill writes go through the transaction in `commit_fill`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::types::order::{Order, OrderSide, OrderStatus, OrderStyle};

pub(crate) fn side_to_str(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "BUY",
        OrderSide::Sell => "SELL",
    }
}

pub(crate) fn style_to_str(style: OrderStyle) -> &'static str {
    match style {
        OrderStyle::Market => "MARKET",
        OrderStyle::Limit => "LIMIT",
        OrderStyle::StopLoss => "STOP_LOSS",
    }
}

pub(crate) fn status_to_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "PENDING",
        OrderStatus::Partial => "PARTIAL",
        OrderStatus::Filled => "FILLED",
        OrderStatus::Cancelled => "CANCELLED",
    }
}

fn str_to_side(s: &str) -> Option<OrderSide> {
    match s {
        "BUY" => Some(OrderSide::Buy),
        "SELL" => Some(OrderSide::Sell),
        _ => None,
    }
}

fn str_to_style(s: &str) -> Option<OrderStyle> {
    match s {
        "MARKET" => Some(OrderStyle::Market),
        "LIMIT" => Some(OrderStyle::Limit),
        "STOP_LOSS" => Some(OrderStyle::StopLoss),
        _ => None,
    }
}

fn str_to_status(s: &str) -> Option<OrderStatus> {
    match s {
        "PENDING" => Some(OrderStatus::Pending),
        "PARTIAL" => Some(OrderStatus::Partial),
        "FILLED" => Some(OrderStatus::Filled),
        "CANCELLED" => Some(OrderStatus::Cancelled),
        _ => None,
    }
}

/// Insert a freshly placed Pending order.
pub async fn insert_order(pool: &PgPool, order: &Order) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO orders \
           (id, user_id, portfolio_id, instrument_id, broker_id, side, style, quantity, price, \
            executed_price, executed_quantity, status, total_cost, commission, created_at, executed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.portfolio_id)
    .bind(&order.instrument_id)
    .bind(&order.broker_id)
    .bind(side_to_str(order.side))
    .bind(style_to_str(order.style))
    .bind(i64::from(order.quantity))
    .bind(order.price)
    .bind(order.executed_price)
    .bind(order.executed_quantity.map(i64::from))
    .bind(status_to_str(order.status))
    .bind(order.total_cost)
    .bind(order.commission)
    .bind(order.created_at)
    .bind(order.executed_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Status-only update (cancellation).
pub async fn update_order_status(
    pool: &PgPool,
    id: Uuid,
    status: OrderStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
        .bind(status_to_str(status))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(Debug, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub portfolio_id: Uuid,
    pub instrument_id: String,
    pub broker_id: String,
    pub side: String,
    pub style: String,
    pub quantity: i64,
    pub price: Decimal,
    pub executed_price: Option<Decimal>,
    pub executed_quantity: Option<i64>,
    pub status: String,
    pub total_cost: Decimal,
    pub commission: Decimal,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

/// Convert a row for hydration. Rows with unknown enum strings or
/// out-of-range quantities are skipped.
pub fn order_row_to_order(row: OrderRow) -> Option<Order> {
    let side = str_to_side(&row.side)?;
    let style = str_to_style(&row.style)?;
    let status = str_to_status(&row.status)?;
    let quantity = row.quantity.try_into().ok().filter(|&q: &u32| q > 0)?;
    let executed_quantity = match row.executed_quantity {
        Some(q) => Some(q.try_into().ok()?),
        None => None,
    };
    Some(Order {
        id: row.id,
        user_id: row.user_id,
        portfolio_id: row.portfolio_id,
        instrument_id: row.instrument_id,
        broker_id: row.broker_id,
        side,
        style,
        quantity,
        price: row.price,
        executed_price: row.executed_price,
        executed_quantity,
        status,
        total_cost: row.total_cost,
        commission: row.commission,
        created_at: row.created_at,
        executed_at: row.executed_at,
    })
}

/// All orders, for hydration.
pub async fn list_orders(pool: &PgPool) -> Result<Vec<OrderRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderRow>(
        "SELECT id, user_id, portfolio_id, instrument_id, broker_id, side, style, quantity, price, \
                executed_price, executed_quantity, status, total_cost, commission, created_at, executed_at \
         FROM orders",
    )
    .fetch_all(pool)
    .await
}
