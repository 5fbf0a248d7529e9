//! Broker persistence: seed upsert and hydration.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use crate::types::broker::Broker;

#[derive(Debug, FromRow)]
pub struct BrokerRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub commission: Decimal,
    pub is_active: bool,
}

pub fn broker_row_to_broker(row: BrokerRow) -> Broker {
    Broker {
        id: row.id,
        name: row.name,
        description: row.description,
        commission: row.commission,
        is_active: row.is_active,
    }
}

pub async fn upsert_broker(pool: &PgPool, broker: &Broker) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO brokers (id, name, description, commission, is_active) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (id) DO UPDATE SET \
           name = $2, description = $3, commission = $4, is_active = $5",
    )
    .bind(&broker.id)
    .bind(&broker.name)
    .bind(&broker.description)
    .bind(broker.commission)
    .bind(broker.is_active)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_brokers(pool: &PgPool) -> Result<Vec<BrokerRow>, sqlx::Error> {
    sqlx::query_as::<_, BrokerRow>(
        "SELECT id, name, description, commission, is_active FROM brokers",
    )
    .fetch_all(pool)
    .await
}
