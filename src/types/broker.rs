use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Static reference data: the Botswana brokerages an order is routed through.
/// `commission` is the flat per-order fee used when the request carries none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Broker {
    pub id: String,
    pub name: String,
    pub description: String,
    pub commission: Decimal,
    pub is_active: bool,
}
