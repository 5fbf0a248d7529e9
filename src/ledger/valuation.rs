//! Point-in-time portfolio aggregates from holdings and current prices.
//! Display-only derived views; the ledger never mutates state based on them.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::ledger::{self, SharedLedger};
use crate::market::{self, SharedMarket};
use crate::types::portfolio::Holding;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Valuation {
    pub market_value: Decimal,
    pub total_value: Decimal,
    pub cost_basis: Decimal,
    pub unrealized_pl: Decimal,
}

/// Sum of quantity x current price. Instruments with no known price (should
/// not happen for live holdings) contribute zero.
pub fn market_value(holdings: &[Holding], prices: &HashMap<String, Decimal>) -> Decimal {
    holdings
        .iter()
        .map(|h| {
            let price = prices.get(&h.instrument_id).copied().unwrap_or(Decimal::ZERO);
            price * Decimal::from(h.quantity)
        })
        .sum()
}

pub fn cost_basis(holdings: &[Holding]) -> Decimal {
    holdings.iter().map(|h| h.total_cost).sum()
}

pub fn unrealized_pl(holdings: &[Holding], prices: &HashMap<String, Decimal>) -> Decimal {
    market_value(holdings, prices) - cost_basis(holdings)
}

/// Full valuation of one portfolio against a snapshot of current prices.
pub async fn portfolio_valuation(
    ledger: &SharedLedger,
    market: &SharedMarket,
    portfolio_id: Uuid,
    cash_balance: Decimal,
) -> Valuation {
    let holdings = ledger::holdings_for_portfolio(ledger, portfolio_id).await;
    let mut prices = HashMap::new();
    for holding in &holdings {
        if let Some(instrument) = market::get_instrument(market, &holding.instrument_id).await {
            prices.insert(holding.instrument_id.clone(), instrument.current_price);
        }
    }
    let market_value = market_value(&holdings, &prices);
    let cost_basis = cost_basis(&holdings);
    Valuation {
        market_value,
        total_value: market_value + cash_balance,
        cost_basis,
        unrealized_pl: market_value - cost_basis,
    }
}
