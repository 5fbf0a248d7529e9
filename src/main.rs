use bse_exchange::api::auth::new_user_store;
use bse_exchange::api::routes::{app_router, AppState};
use bse_exchange::config::Config;
use bse_exchange::ledger::new_shared_ledger;
use bse_exchange::market::{new_shared_brokers, new_shared_market};
use bse_exchange::{bootstrap, feed, persistence};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let db = match &config.database_url {
        Some(url) => Some(
            persistence::create_pool_and_migrate(url)
                .await
                .expect("database connection failed"),
        ),
        None => {
            tracing::warn!("DATABASE_URL not set, running in-memory only");
            None
        }
    };

    let market = new_shared_market();
    let brokers = new_shared_brokers();
    let ledger = new_shared_ledger();
    let users = new_user_store();
    bootstrap::init_state(db.as_ref(), &market, &brokers, &ledger, &users)
        .await
        .expect("state initialization failed");

    let (feed_tx, _) = broadcast::channel(1024);
    tokio::spawn(feed::run_price_feed(
        market.clone(),
        db.clone(),
        feed_tx.clone(),
        config.feed_interval_secs,
    ));

    let state = AppState {
        market,
        brokers,
        ledger,
        users,
        feed: feed_tx,
        db,
        jwt_secret: config.jwt_secret.clone(),
        starting_cash: config.starting_cash,
    };

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("bind failed");
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await.expect("server error");
}
