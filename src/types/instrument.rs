use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tradable BSE security. `current_price` is mutated only by the price feed;
/// the ledger reads it when resolving effective prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
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

/// One price observation, append-only. Owned by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub instrument_id: String,
    pub price: Decimal,
    pub volume: u32,
    pub timestamp: DateTime<Utc>,
}
