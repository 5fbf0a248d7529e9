//! Startup wiring: hydrate the in-memory stores from the DB when one is
//! configured, and seed the BSE reference data when the store starts empty.

use sqlx::PgPool;

use crate::api::auth::{UserRecord, UserStore};
use crate::ledger::{self, SharedLedger};
use crate::market::{self, SharedBrokers, SharedMarket};
use crate::persistence;
use crate::seed;

/// How much history per instrument is pulled back into the in-memory ring.
const HISTORY_HYDRATION_LIMIT: usize = 500;

pub async fn init_state(
    db: Option<&PgPool>,
    market: &SharedMarket,
    brokers: &SharedBrokers,
    ledger: &SharedLedger,
    users: &UserStore,
) -> Result<(), sqlx::Error> {
    if let Some(pool) = db {
        hydrate(pool, market, brokers, ledger, users).await?;
    }
    if market::list_active_instruments(market).await.is_empty() {
        seed_reference_data(db, market, brokers).await?;
    }
    Ok(())
}

async fn hydrate(
    pool: &PgPool,
    market: &SharedMarket,
    brokers: &SharedBrokers,
    ledger: &SharedLedger,
    users: &UserStore,
) -> Result<(), sqlx::Error> {
    let instrument_rows = persistence::list_instruments(pool).await?;
    let instrument_count = instrument_rows.len();
    for row in instrument_rows {
        let instrument = persistence::instrument_row_to_instrument(row);
        let history =
            persistence::list_price_history(pool, &instrument.id, HISTORY_HYDRATION_LIMIT).await?;
        // Rows come back most recent first; the ring wants oldest first.
        for point_row in history.into_iter().rev() {
            market::record_price(market, persistence::price_point_row_to_point(point_row)).await;
        }
        market::upsert_instrument(market, instrument).await;
    }

    for row in persistence::list_brokers(pool).await? {
        market::upsert_broker(brokers, persistence::broker_row_to_broker(row)).await;
    }

    {
        let mut guard = users.write().await;
        for row in persistence::list_users(pool).await? {
            guard.insert(
                row.username.clone(),
                UserRecord {
                    id: row.id,
                    username: row.username,
                    password_hash: row.password_hash,
                },
            );
        }
    }

    for row in persistence::list_portfolios(pool).await? {
        ledger::load_portfolio(ledger, persistence::portfolio_row_to_portfolio(row)).await;
    }
    for row in persistence::list_holdings(pool).await? {
        match persistence::holding_row_to_holding(row) {
            Some(holding) => ledger::load_holding(ledger, holding).await,
            None => tracing::warn!("skipping holding row with invalid quantity"),
        }
    }
    let mut skipped = 0usize;
    for row in persistence::list_orders(pool).await? {
        match persistence::order_row_to_order(row) {
            Some(order) => ledger::load_order(ledger, order).await,
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, "skipped unreadable order rows during hydration");
    }

    tracing::info!(instruments = instrument_count, "state hydrated from database");
    Ok(())
}

async fn seed_reference_data(
    db: Option<&PgPool>,
    market: &SharedMarket,
    brokers: &SharedBrokers,
) -> Result<(), sqlx::Error> {
    for instrument in seed::bse_instruments() {
        if let Some(pool) = db {
            persistence::upsert_instrument(pool, &instrument).await?;
        }
        market::upsert_instrument(market, instrument).await;
    }
    for broker in seed::bse_brokers() {
        if let Some(pool) = db {
            persistence::upsert_broker(pool, &broker).await?;
        }
        market::upsert_broker(brokers, broker).await;
    }
    tracing::info!("seeded BSE reference data");
    Ok(())
}
