//! Price history persistence: append-only inserts from the feed, recent-first
//! reads for hydration of the in-memory rings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use crate::types::instrument::PricePoint;

#[derive(Debug, FromRow)]
pub struct PricePointRow {
    pub instrument_id: String,
    pub price: Decimal,
    pub volume: i64,
    pub timestamp: DateTime<Utc>,
}

pub fn price_point_row_to_point(row: PricePointRow) -> PricePoint {
    PricePoint {
        instrument_id: row.instrument_id,
        price: row.price,
        volume: row.volume.try_into().unwrap_or(0),
        timestamp: row.timestamp,
    }
}

pub async fn insert_price_point(pool: &PgPool, point: &PricePoint) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO price_history (instrument_id, price, volume, timestamp) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(&point.instrument_id)
    .bind(point.price)
    .bind(i64::from(point.volume))
    .bind(point.timestamp)
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recent points first.
pub async fn list_price_history(
    pool: &PgPool,
    instrument_id: &str,
    limit: usize,
) -> Result<Vec<PricePointRow>, sqlx::Error> {
    sqlx::query_as::<_, PricePointRow>(
        "SELECT instrument_id, price, volume, timestamp \
         FROM price_history WHERE instrument_id = $1 ORDER BY timestamp DESC LIMIT $2",
    )
    .bind(instrument_id)
    .bind(limit as i64)
    .fetch_all(pool)
    .await
}
