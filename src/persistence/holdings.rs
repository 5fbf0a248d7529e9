//! Holding persistence: hydration only. Mutations go through the fill
//! transaction (see `commit_fill`), never through standalone writes.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::types::portfolio::Holding;

#[derive(Debug, FromRow)]
pub struct HoldingRow {
    pub portfolio_id: Uuid,
    pub instrument_id: String,
    pub quantity: i64,
    pub average_price: Decimal,
    pub total_cost: Decimal,
}

/// Convert a row, dropping rows with out-of-range quantities.
pub fn holding_row_to_holding(row: HoldingRow) -> Option<Holding> {
    let quantity = row.quantity.try_into().ok()?;
    Some(Holding {
        portfolio_id: row.portfolio_id,
        instrument_id: row.instrument_id,
        quantity,
        average_price: row.average_price,
        total_cost: row.total_cost,
    })
}

pub async fn list_holdings(pool: &PgPool) -> Result<Vec<HoldingRow>, sqlx::Error> {
    sqlx::query_as::<_, HoldingRow>(
        "SELECT portfolio_id, instrument_id, quantity, average_price, total_cost FROM holdings",
    )
    .fetch_all(pool)
    .await
}
