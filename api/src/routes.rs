use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/symbols",
            get(list_symbols).post(add_symbol).delete(remove_symbol),
        )
        .route("/api/klines", get(refresh_klines))
        .route(
            "/api/tokens",
            get(list_tokens).post(add_token).delete(remove_token),
        )
        .route("/api/okx/token", get(okx_token_detail))
        .route("/api/metrics/fear-greed", get(fear_greed))
        .route("/api/metrics/dominance", get(dominance))
        .route("/api/metrics/global", get(global_metrics))
        .route("/api/metrics/protocols", get(protocol_tvl))
        .route("/api/metrics/chains", get(chains_tvl))
        .route("/api/metrics/stablecoins", get(stablecoins_supply))
        .route("/api/metrics/yields", get(pool_yields))
        .route("/api/metrics/volumes", get(dex_volumes))
        .route("/api/metrics/fees", get(protocol_fees))
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct SymbolListQuery {
    user_id: String,
    list_type: String,
}

#[derive(Deserialize)]
struct SymbolBody {
    user_id: String,
    list_type: String,
    symbol: String,
}

async fn list_symbols(
    State(state): State<AppState>,
    Query(query): Query<SymbolListQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbols = state.symbols.list(&query.user_id, &query.list_type).await?;
    Ok(Json(json!({ "symbols": symbols })))
}

async fn add_symbol(
    State(state): State<AppState>,
    Json(body): Json<SymbolBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state
        .symbols
        .add(&body.user_id, &body.list_type, &body.symbol)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "status": "created" }))))
}

async fn remove_symbol(
    State(state): State<AppState>,
    Json(body): Json<SymbolBody>,
) -> Result<StatusCode, ApiError> {
    state
        .symbols
        .remove(&body.user_id, &body.list_type, &body.symbol)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn refresh_klines(
    State(state): State<AppState>,
    Query(query): Query<SymbolListQuery>,
) -> Result<Response, ApiError> {
    let symbols = state.symbols.list(&query.user_id, &query.list_type).await?;
    let scope = format!("{}:{}", query.user_id, query.list_type);
    match state.refresher.refresh(&scope, &symbols).await? {
        Some(result) => Ok(Json(json!({
            "klines": result.klines,
            "last_updated": result.last_updated,
        }))
        .into_response()),
        None => Ok((
            StatusCode::CONFLICT,
            Json(json!({ "error": "refresh superseded by a newer request" })),
        )
            .into_response()),
    }
}

#[derive(Deserialize)]
struct UserQuery {
    user_id: String,
}

#[derive(Deserialize)]
struct TokenBody {
    user_id: String,
    name: String,
    symbol: String,
    contract_address: String,
}

#[derive(Deserialize)]
struct TokenRemoveBody {
    user_id: String,
    contract_address: String,
}

async fn list_tokens(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let tokens = state.tokens.list(&query.user_id).await?;
    Ok(Json(json!({ "tokens": tokens })))
}

async fn add_token(
    State(state): State<AppState>,
    Json(body): Json<TokenBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state
        .tokens
        .add(&body.user_id, &body.name, &body.symbol, &body.contract_address)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "status": "created" }))))
}

async fn remove_token(
    State(state): State<AppState>,
    Json(body): Json<TokenRemoveBody>,
) -> Result<StatusCode, ApiError> {
    state
        .tokens
        .remove(&body.user_id, &body.contract_address)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct TokenDetailQuery {
    #[serde(rename = "tokenAddress")]
    token_address: Option<String>,
}

/// Server-side signed proxy so the OKX secret never ships to a browser.
async fn okx_token_detail(
    State(state): State<AppState>,
    Query(query): Query<TokenDetailQuery>,
) -> Result<Json<Value>, ApiError> {
    let address = query.token_address.unwrap_or_default();
    if address.trim().is_empty() {
        return Err(shared::Error::Validation("tokenAddress is required".to_string()).into());
    }
    let detail = state.okx.token_detail(&address).await?;
    Ok(Json(json!({ "token": detail })))
}

async fn fear_greed(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let index = state.metrics.fear_greed_index().await?;
    Ok(Json(json!(index)))
}

async fn dominance(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let dominance = state.metrics.market_dominance().await?;
    Ok(Json(json!(dominance)))
}

async fn global_metrics(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let metrics = state.metrics.global_metrics().await?;
    Ok(Json(json!(metrics)))
}

async fn protocol_tvl(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let protocols = state.metrics.protocol_tvl().await?;
    Ok(Json(json!({ "protocols": protocols })))
}

async fn chains_tvl(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let chains = state.metrics.chains_tvl().await?;
    Ok(Json(json!({ "chains": chains })))
}

async fn stablecoins_supply(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let overview = state.metrics.stablecoins_supply().await?;
    Ok(Json(json!(overview)))
}

async fn pool_yields(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let pools = state.metrics.pool_yields().await?;
    Ok(Json(json!({ "pools": pools })))
}

async fn dex_volumes(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let protocols = state.metrics.dex_volumes().await?;
    Ok(Json(json!({ "protocols": protocols })))
}

async fn protocol_fees(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let protocols = state.metrics.protocol_fees().await?;
    Ok(Json(json!({ "protocols": protocols })))
}
