use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Qty = u32;
pub type OrderId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStyle {
    #[default]
    Market,
    Limit,
    StopLoss,
}

/// `Partial` is reserved for a future partial-fill extension; nothing
/// transitions into it today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Partial,
    Filled,
    Cancelled,
}

impl OrderStatus {
    /// Filled and Cancelled are terminal; no further transition is legal.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ();

    /// Parses the wire form used by `?status=` filters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PARTIAL" => Ok(OrderStatus::Partial),
            "FILLED" => Ok(OrderStatus::Filled),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Uuid,
    pub portfolio_id: Uuid,
    pub instrument_id: String,
    pub broker_id: String,
    pub side: OrderSide,
    pub style: OrderStyle,
    pub quantity: Qty,
    /// Effective price resolved at placement: the limit price if supplied,
    /// else the instrument's current price.
    pub price: Decimal,
    pub executed_price: Option<Decimal>,
    pub executed_quantity: Option<Qty>,
    pub status: OrderStatus,
    /// quantity x price + commission, fixed at placement. The BUY cash leg
    /// deducts this recorded value, never a recomputation.
    pub total_cost: Decimal,
    pub commission: Decimal,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}
