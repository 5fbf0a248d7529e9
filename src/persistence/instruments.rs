//! Instrument persistence: administrative upsert, price writes, hydration.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use crate::types::instrument::Instrument;

#[derive(Debug, FromRow)]
pub struct InstrumentRow {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub current_price: Decimal,
    pub previous_close: Decimal,
    pub market_cap: Decimal,
    pub pe_ratio: Decimal,
    pub dividend_yield: Decimal,
    pub is_active: bool,
}

pub fn instrument_row_to_instrument(row: InstrumentRow) -> Instrument {
    Instrument {
        id: row.id,
        symbol: row.symbol,
        name: row.name,
        sector: row.sector,
        current_price: row.current_price,
        previous_close: row.previous_close,
        market_cap: row.market_cap,
        pe_ratio: row.pe_ratio,
        dividend_yield: row.dividend_yield,
        is_active: row.is_active,
    }
}

/// Insert or replace an instrument (seed data at startup).
pub async fn upsert_instrument(pool: &PgPool, instrument: &Instrument) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO instruments \
           (id, symbol, name, sector, current_price, previous_close, market_cap, pe_ratio, dividend_yield, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (id) DO UPDATE SET \
           symbol = $2, name = $3, sector = $4, current_price = $5, previous_close = $6, \
           market_cap = $7, pe_ratio = $8, dividend_yield = $9, is_active = $10",
    )
    .bind(&instrument.id)
    .bind(&instrument.symbol)
    .bind(&instrument.name)
    .bind(&instrument.sector)
    .bind(instrument.current_price)
    .bind(instrument.previous_close)
    .bind(instrument.market_cap)
    .bind(instrument.pe_ratio)
    .bind(instrument.dividend_yield)
    .bind(instrument.is_active)
    .execute(pool)
    .await?;
    Ok(())
}

/// Write a new current price (feed tick).
pub async fn update_instrument_price(
    pool: &PgPool,
    instrument_id: &str,
    price: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE instruments SET current_price = $1 WHERE id = $2")
        .bind(price)
        .bind(instrument_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// All instruments, for hydration.
pub async fn list_instruments(pool: &PgPool) -> Result<Vec<InstrumentRow>, sqlx::Error> {
    sqlx::query_as::<_, InstrumentRow>(
        "SELECT id, symbol, name, sector, current_price, previous_close, market_cap, pe_ratio, dividend_yield, is_active \
         FROM instruments",
    )
    .fetch_all(pool)
    .await
}
