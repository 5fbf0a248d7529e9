//! Price feed: a bounded random walk over active instruments on a fixed
//! interval. The feed is the sole writer of current prices; the ledger only
//! ever reads them. Updates are published on a broadcast channel.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::broadcast;

use crate::market::{self, SharedMarket};
use crate::persistence;
use crate::types::instrument::PricePoint;

/// Maximum move per tick, either direction.
const MAX_MOVE: f64 = 0.02;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceUpdate {
    pub symbol: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub timestamp: DateTime<Utc>,
}

pub type FeedSender = broadcast::Sender<PriceUpdate>;

fn price_floor() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

/// One tick: move every active instrument by a random +/-2%, floored at 0.01,
/// append history, publish. DB write failures are logged and never abort the
/// tick; ledger invariants do not depend on feed durability.
pub async fn tick_prices(market: &SharedMarket, db: Option<&PgPool>, tx: &FeedSender) {
    let instruments = market::list_active_instruments(market).await;

    // ThreadRng is not Send; draw everything before the awaits below.
    let draws: Vec<(f64, u32)> = {
        let mut rng = rand::rng();
        instruments
            .iter()
            .map(|_| (rng.random_range(-MAX_MOVE..=MAX_MOVE), rng.random_range(0..1000)))
            .collect()
    };

    for (instrument, (pct, volume)) in instruments.iter().zip(draws) {
        let old = instrument.current_price;
        let factor = Decimal::from_f64(1.0 + pct).unwrap_or(Decimal::ONE);
        let price = (old * factor).round_dp(3).max(price_floor());

        market::apply_price(market, &instrument.id, price).await;
        let point = PricePoint {
            instrument_id: instrument.id.clone(),
            price,
            volume,
            timestamp: Utc::now(),
        };
        market::record_price(market, point.clone()).await;

        if let Some(pool) = db {
            if let Err(err) = persistence::update_instrument_price(pool, &instrument.id, price).await
            {
                tracing::warn!(instrument = %instrument.id, %err, "price write failed");
            }
            if let Err(err) = persistence::insert_price_point(pool, &point).await {
                tracing::warn!(instrument = %instrument.id, %err, "history write failed");
            }
        }

        let change = price - old;
        let change_percent = if old > Decimal::ZERO {
            (change / old * Decimal::from(100)).round_dp(2)
        } else {
            Decimal::ZERO
        };
        // No subscribers is fine.
        let _ = tx.send(PriceUpdate {
            symbol: instrument.symbol.clone(),
            price,
            change,
            change_percent,
            timestamp: point.timestamp,
        });
    }
}

/// Run the feed until the process exits.
pub async fn run_price_feed(
    market: SharedMarket,
    db: Option<PgPool>,
    tx: FeedSender,
    interval_secs: u64,
) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        tick_prices(&market, db.as_ref(), &tx).await;
        tracing::debug!("feed tick complete");
    }
}
