//! Portfolio persistence: insert at registration, hydration. Balance updates
//! happen only inside the fill transaction (see `commit_fill`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::types::portfolio::Portfolio;

#[derive(Debug, FromRow)]
pub struct PortfolioRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub cash_balance: Decimal,
    pub total_value: Decimal,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

pub fn portfolio_row_to_portfolio(row: PortfolioRow) -> Portfolio {
    Portfolio {
        id: row.id,
        user_id: row.user_id,
        name: row.name,
        cash_balance: row.cash_balance,
        total_value: row.total_value,
        total_cost: row.total_cost,
        created_at: row.created_at,
    }
}

pub async fn insert_portfolio(pool: &PgPool, portfolio: &Portfolio) -> Result<(), sqlx::Error> {
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
    .execute(pool)
    .await?;
    Ok(())
}

/// All portfolios, for hydration.
pub async fn list_portfolios(pool: &PgPool) -> Result<Vec<PortfolioRow>, sqlx::Error> {
    sqlx::query_as::<_, PortfolioRow>(
        "SELECT id, user_id, name, cash_balance, total_value, total_cost, created_at FROM portfolios",
    )
    .fetch_all(pool)
    .await
}
