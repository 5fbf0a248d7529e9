use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::order::{OrderStatus, Qty};

/// Error taxonomy of the ledger engine. Validation and business-rule errors
/// are rejected before any mutation; `Persistence` aborts the whole sequence
/// with nothing committed.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid order: {0}")]
    Validation(String),

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("insufficient shares: requested {requested}, held {held}")]
    InsufficientShares { requested: Qty, held: Qty },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("order belongs to another user")]
    Forbidden,

    #[error("operation not allowed while order is {0:?}")]
    InvalidState(OrderStatus),

    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}
