//! HTTP surface: thin request/response mapping onto the ledger engine and
//! the shared market/auth stores. Input validation happens here (typed
//! bodies) and in the ledger (business rules).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::auth::{self, AuthUser, UserRecord, UserStore};
use crate::api::error::ApiError;
use crate::feed::FeedSender;
use crate::ledger::valuation::{self, Valuation};
use crate::ledger::{self, OrderRequest, SharedLedger};
use crate::market::{self, SharedBrokers, SharedMarket};
use crate::persistence;
use crate::types::broker::Broker;
use crate::types::instrument::{Instrument, PricePoint};
use crate::types::order::{Order, OrderStatus};
use crate::types::portfolio::{Holding, Portfolio};

const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub market: SharedMarket,
    pub brokers: SharedBrokers,
    pub ledger: SharedLedger,
    pub users: UserStore,
    pub feed: FeedSender,
    pub db: Option<PgPool>,
    pub jwt_secret: Vec<u8>,
    pub starting_cash: Decimal,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/instruments", get(list_instruments))
        .route("/instruments/{id}", get(get_instrument))
        .route("/instruments/{id}/history", get(get_price_history))
        .route("/brokers", get(list_brokers))
        .route("/portfolio", get(get_portfolio))
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/{id}/cancel", patch(cancel_order))
        .with_state(state)
}

async fn health() -> &'static str {
    "healthy"
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let username = req.username.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username is required".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    // Hold the write lock across the duplicate check and the inserts so two
    // racing registrations cannot both claim the name.
    let mut users = state.users.write().await;
    if users.contains_key(&username) {
        return Err(ApiError::BadRequest("username already taken".into()));
    }

    let password_hash =
        auth::hash_password(&req.password).map_err(|e| ApiError::Internal(e.to_string()))?;
    let user_id = Uuid::new_v4();
    let portfolio = Portfolio {
        id: Uuid::new_v4(),
        user_id,
        name: "My Trading Portfolio".to_string(),
        cash_balance: state.starting_cash,
        total_value: Decimal::ZERO,
        total_cost: Decimal::ZERO,
        created_at: Utc::now(),
    };
    // User row and portfolio commit together; memory is only touched after.
    if let Some(pool) = &state.db {
        persistence::commit_registration(pool, user_id, &username, &password_hash, &portfolio)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
    }
    ledger::load_portfolio(&state.ledger, portfolio).await;
    users.insert(
        username.clone(),
        UserRecord {
            id: user_id,
            username: username.clone(),
            password_hash,
        },
    );
    tracing::info!(%username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "user_id": user_id, "username": username })),
    ))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let username = req.username.trim().to_lowercase();
    let users = state.users.read().await;
    let user = users.get(&username).ok_or(ApiError::Unauthorized)?;
    if !auth::verify_password(&user.password_hash, &req.password) {
        return Err(ApiError::Unauthorized);
    }
    let token = auth::create_token(&state.jwt_secret, user.id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(json!({ "token": token })))
}

async fn list_instruments(State(state): State<AppState>) -> Json<Vec<Instrument>> {
    Json(market::list_active_instruments(&state.market).await)
}

async fn get_instrument(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Instrument>, ApiError> {
    market::get_instrument(&state.market, &id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound("instrument"))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn get_price_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<PricePoint>>, ApiError> {
    if market::get_instrument(&state.market, &id).await.is_none() {
        return Err(ApiError::NotFound("instrument"));
    }
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(market::price_history(&state.market, &id, limit).await))
}

async fn list_brokers(State(state): State<AppState>) -> Json<Vec<Broker>> {
    Json(market::list_active_brokers(&state.brokers).await)
}

#[derive(Debug, Serialize)]
struct HoldingView {
    #[serde(flatten)]
    holding: Holding,
    instrument: Option<Instrument>,
}

#[derive(Debug, Serialize)]
struct PortfolioView {
    #[serde(flatten)]
    portfolio: Portfolio,
    holdings: Vec<HoldingView>,
    valuation: Valuation,
}

async fn get_portfolio(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PortfolioView>, ApiError> {
    let portfolio = ledger::get_portfolio_for_user(&state.ledger, user.user_id)
        .await
        .ok_or(ApiError::NotFound("portfolio"))?;
    let holdings = ledger::holdings_for_portfolio(&state.ledger, portfolio.id).await;
    let valuation = valuation::portfolio_valuation(
        &state.ledger,
        &state.market,
        portfolio.id,
        portfolio.cash_balance,
    )
    .await;

    let mut views = Vec::with_capacity(holdings.len());
    for holding in holdings {
        let instrument = market::get_instrument(&state.market, &holding.instrument_id).await;
        views.push(HoldingView {
            holding,
            instrument,
        });
    }
    Ok(Json(PortfolioView {
        portfolio,
        holdings: views,
        valuation,
    }))
}

async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<OrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = ledger::place_order(
        &state.ledger,
        &state.market,
        &state.brokers,
        state.db.as_ref(),
        user.user_id,
        req,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
struct OrdersParams {
    status: Option<String>,
}

async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<OrdersParams>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let status = match params.status.as_deref() {
        Some(s) => Some(
            s.parse::<OrderStatus>()
                .map_err(|_| ApiError::BadRequest(format!("unknown status {s}")))?,
        ),
        None => None,
    };
    Ok(Json(
        ledger::orders_for_user(&state.ledger, user.user_id, status).await,
    ))
}

async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let order = ledger::cancel_order(&state.ledger, state.db.as_ref(), id, user.user_id).await?;
    Ok(Json(order))
}
