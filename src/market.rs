//! Market reference data: instruments, recent price history, brokers.
//! The price feed is the only writer of current prices; the ledger and the
//! API layer only read. Testable without HTTP.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::types::broker::Broker;
use crate::types::instrument::{Instrument, PricePoint};

/// Per-instrument history ring capacity. Older points live only in the DB.
const HISTORY_CAPACITY: usize = 500;

#[derive(Default)]
pub struct MarketState {
    instruments: HashMap<String, Instrument>,
    history: HashMap<String, VecDeque<PricePoint>>,
}

pub type SharedMarket = Arc<RwLock<MarketState>>;
pub type SharedBrokers = Arc<RwLock<HashMap<String, Broker>>>;

pub fn new_shared_market() -> SharedMarket {
    Arc::new(RwLock::new(MarketState::default()))
}

pub fn new_shared_brokers() -> SharedBrokers {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Insert or replace an instrument (seed data and administrative upsert).
pub async fn upsert_instrument(market: &SharedMarket, instrument: Instrument) {
    let mut guard = market.write().await;
    guard.instruments.insert(instrument.id.clone(), instrument);
}

pub async fn get_instrument(market: &SharedMarket, id: &str) -> Option<Instrument> {
    let guard = market.read().await;
    guard.instruments.get(id).cloned()
}

/// Active instruments, sorted by symbol for stable listings.
pub async fn list_active_instruments(market: &SharedMarket) -> Vec<Instrument> {
    let guard = market.read().await;
    let mut out: Vec<Instrument> = guard
        .instruments
        .values()
        .filter(|i| i.is_active)
        .cloned()
        .collect();
    out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    out
}

/// Set a new current price. Returns the updated instrument, or None when the
/// id is unknown.
pub async fn apply_price(
    market: &SharedMarket,
    instrument_id: &str,
    price: Decimal,
) -> Option<Instrument> {
    let mut guard = market.write().await;
    let instrument = guard.instruments.get_mut(instrument_id)?;
    instrument.current_price = price;
    Some(instrument.clone())
}

/// Append a price observation to the in-memory ring.
pub async fn record_price(market: &SharedMarket, point: PricePoint) {
    let mut guard = market.write().await;
    let ring = guard.history.entry(point.instrument_id.clone()).or_default();
    if ring.len() == HISTORY_CAPACITY {
        ring.pop_front();
    }
    ring.push_back(point);
}

/// Recent price history for an instrument, most recent first.
pub async fn price_history(
    market: &SharedMarket,
    instrument_id: &str,
    limit: usize,
) -> Vec<PricePoint> {
    let guard = market.read().await;
    match guard.history.get(instrument_id) {
        Some(ring) => ring.iter().rev().take(limit).cloned().collect(),
        None => Vec::new(),
    }
}

pub async fn upsert_broker(brokers: &SharedBrokers, broker: Broker) {
    let mut guard = brokers.write().await;
    guard.insert(broker.id.clone(), broker);
}

pub async fn get_broker(brokers: &SharedBrokers, id: &str) -> Option<Broker> {
    let guard = brokers.read().await;
    guard.get(id).cloned()
}

/// Active brokers, sorted by id.
pub async fn list_active_brokers(brokers: &SharedBrokers) -> Vec<Broker> {
    let guard = brokers.read().await;
    let mut out: Vec<Broker> = guard.values().filter(|b| b.is_active).cloned().collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    out
}
