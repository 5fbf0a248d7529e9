//! Environment configuration. `.env` is honoured via dotenvy in `main`.

use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// Absent means in-memory only: no durability, no hydration.
    pub database_url: Option<String>,
    pub jwt_secret: Vec<u8>,
    pub feed_interval_secs: u64,
    /// Cash a freshly registered portfolio starts with.
    pub starting_cash: Decimal,
}

impl Config {
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let database_url = std::env::var("DATABASE_URL").ok();
        let jwt_secret = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "dev-only-secret-change-me".to_string())
            .into_bytes();
        let feed_interval_secs = std::env::var("FEED_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        let starting_cash = std::env::var("STARTING_CASH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| Decimal::from(10_000));
        Self {
            bind_addr,
            database_url,
            jwt_secret,
            feed_interval_secs,
            starting_cash,
        }
    }
}
