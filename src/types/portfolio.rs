use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::order::Qty;

/// One portfolio per user, created at registration. `cash_balance` stays >= 0
/// after every committed order; `total_value`/`total_cost` are cached
/// aggregates refreshed on fills, never a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub cash_balance: Decimal,
    pub total_value: Decimal,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A portfolio's position in one instrument. `total_cost` equals
/// quantity x average_price on every mutation; fully liquidated holdings
/// are removed rather than kept at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub portfolio_id: Uuid,
    pub instrument_id: String,
    pub quantity: Qty,
    pub average_price: Decimal,
    pub total_cost: Decimal,
}
