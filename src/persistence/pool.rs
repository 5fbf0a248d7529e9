//! Database pool and embedded migrations.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to `database_url` and bring the schema up to date.
pub async fn create_pool_and_migrate(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database connected, migrations applied");
    Ok(pool)
}
