use crate::envelope::{ApiError, Envelope};
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use mt5gw_core::{Bar, ConnectionDescriptor, Credentials, ExecutionReport};
use mt5gw_gateway::{BarRequest, GatewayError, OrderIntent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Health
        .route("/health", get(health_check))
        // Session
        .route("/connect", post(connect))
        .route("/connect_mt5", post(connect))
        // Market data
        .route("/fetch_bars", get(fetch_bars))
        .route("/fetch_btc_data", get(fetch_bars))
        // Orders
        .route("/execute_trade", post(execute_trade))
}

fn invalid(detail: impl std::fmt::Display) -> ApiError {
    ApiError(GatewayError::InvalidRequest(detail.to_string()))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthReport {
    version: &'static str,
    terminal: String,
    connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<ConnectionDescriptor>,
    uptime_secs: i64,
}

async fn health_check(State(state): State<Arc<AppState>>) -> Envelope<HealthReport> {
    let account = state.gateway.session().await;
    Envelope::success(HealthReport {
        version: env!("CARGO_PKG_VERSION"),
        terminal: state.gateway.terminal_name().to_string(),
        connected: account.is_some(),
        account,
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
    })
    .with_message("ok")
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectRequest {
    #[serde(alias = "account_id")]
    account_id: Option<u64>,
    #[serde(alias = "password")]
    credential: Option<String>,
    server: Option<String>,
}

async fn connect(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Envelope<ConnectionDescriptor>, ApiError> {
    let Json(req) = body.map_err(|e| invalid(e.body_text()))?;

    let (Some(account_id), Some(password), Some(server)) =
        (req.account_id, req.credential, req.server)
    else {
        return Err(invalid("Missing credentials."));
    };

    let descriptor = state
        .gateway
        .connect(Credentials::new(account_id, password, server))
        .await?;

    Ok(Envelope::success(descriptor).with_message("Connected to MetaTrader5."))
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

fn default_symbol() -> String {
    "BTCUSD".to_string()
}

fn default_timeframe() -> u32 {
    5
}

fn default_count() -> u32 {
    1000
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BarsQuery {
    #[serde(default = "default_symbol")]
    symbol: String,
    #[serde(default = "default_timeframe", alias = "timeframe")]
    timeframe_minutes: u32,
    #[serde(default = "default_count", alias = "num_bars")]
    count: u32,
}

async fn fetch_bars(
    State(state): State<Arc<AppState>>,
    query: Result<Query<BarsQuery>, QueryRejection>,
) -> Result<Envelope<Vec<Bar>>, ApiError> {
    // Before any login every request fails the same way, well-formed or not.
    if !state.gateway.is_connected().await {
        return Err(ApiError(GatewayError::NotConnected));
    }
    let Query(q) = query.map_err(|e| invalid(e.body_text()))?;

    let bars = state
        .gateway
        .fetch_bars(BarRequest::new(q.symbol, q.timeframe_minutes, q.count))
        .await?;

    Ok(Envelope::success(bars))
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeRequest {
    symbol: Option<String>,
    #[serde(alias = "action")]
    direction: Option<String>,
    #[serde(alias = "lot_size")]
    lot_size: Option<Decimal>,
}

async fn execute_trade(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TradeRequest>, JsonRejection>,
) -> Result<Envelope<ExecutionReport>, ApiError> {
    let Json(req) = body.map_err(|e| invalid(e.body_text()))?;

    let intent = OrderIntent::from_parts(
        req.symbol.as_deref(),
        req.direction.as_deref(),
        req.lot_size,
    )?;
    let report = state.gateway.execute_trade(intent).await?;

    let message = format!(
        "Trade executed at price {} with TP {}.",
        report.execution_price.normalize(),
        report.take_profit.normalize()
    );
    Ok(Envelope::success(report).with_message(message))
}
