use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::db::models::{OutcomeRow, PredictionRow};
use crate::db::writer::{insert_outcome, recent_predictions};
use crate::detector::implied_probability;
use crate::error::AppError;
use crate::scorer::accuracy_scorer::{accuracy_summary, AccuracySummary};
use crate::state::SnapshotStore;
use crate::types::{ArbitrageOpportunity, OutcomeResult, SteamMove, ValuePlay};

const DEFAULT_RECENT_LIMIT: i64 = 50;
const MAX_RECENT_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub store: Arc<SnapshotStore>,
    pub latency: Arc<LatencyStats>,
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/implied-probability", get(get_implied_probability))
        .route("/value-plays", get(get_value_plays))
        .route("/arbitrage", get(get_arbitrage))
        .route("/steam", get(get_steam))
        .route("/predictions/recent", get(get_recent_predictions))
        .route("/outcomes", post(post_outcome))
        .route("/stats/accuracy", get(get_stats_accuracy))
        .route("/stats/latency", get(get_stats_latency))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param / body structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ImpliedQuery {
    pub odds: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ValuePlaysQuery {
    pub prop: Option<String>,
    pub min_edge: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentPredictionsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OutcomeRequest {
    pub player: String,
    pub prop: String,
    pub result: String,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ImpliedResponse {
    pub odds: i32,
    pub implied_probability: f64,
}

#[derive(Debug, Serialize)]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
    pub max_us: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub fetch_ok: bool,
    /// 0 until the first evaluation is published.
    pub last_eval_at_ns: u64,
    pub markets: u64,
    pub cycles: u64,
    pub write_queue_pending: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_implied_probability(
    Query(params): Query<ImpliedQuery>,
) -> Result<Json<ImpliedResponse>, AppError> {
    Ok(Json(ImpliedResponse {
        odds: params.odds,
        implied_probability: implied_probability(params.odds)?,
    }))
}

async fn get_value_plays(
    State(state): State<ApiState>,
    Query(params): Query<ValuePlaysQuery>,
) -> Json<Vec<ValuePlay>> {
    let prop = params.prop.as_deref().map(str::trim).filter(|p| !p.is_empty());
    Json(state.store.value_plays(prop, params.min_edge))
}

async fn get_arbitrage(State(state): State<ApiState>) -> Json<Vec<ArbitrageOpportunity>> {
    Json(state.store.arbitrage())
}

async fn get_steam(State(state): State<ApiState>) -> Json<Vec<SteamMove>> {
    Json(state.store.steam())
}

async fn get_recent_predictions(
    State(state): State<ApiState>,
    Query(params): Query<RecentPredictionsQuery>,
) -> Result<Json<Vec<PredictionRow>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    Ok(Json(recent_predictions(&state.pool, limit).await?))
}

async fn post_outcome(
    State(state): State<ApiState>,
    Json(body): Json<OutcomeRequest>,
) -> Result<(StatusCode, Json<OutcomeRow>), AppError> {
    let player = body.player.trim();
    let prop = body.prop.trim();
    if player.is_empty() || prop.is_empty() {
        return Err(AppError::Validation("player and prop are required".to_string()));
    }
    let result: OutcomeResult = body.result.parse()?;

    let row = insert_outcome(&state.pool, player, prop, result, now_ns()).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn get_stats_accuracy(
    State(state): State<ApiState>,
) -> Result<Json<AccuracySummary>, AppError> {
    Ok(Json(accuracy_summary(&state.pool).await?))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let (p50_us, p95_us, p99_us) = state.latency.percentiles();
    Json(LatencyResponse {
        samples: state.latency.len(),
        p50_us,
        p95_us,
        p99_us,
        max_us: state.latency.max_us(),
    })
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let h = &state.health;
    Json(HealthResponse {
        fetch_ok: h.fetch_ok(),
        last_eval_at_ns: h.last_eval_at_ns(),
        markets: h.last_market_count(),
        cycles: h.cycles(),
        write_queue_pending: h.write_queue_pending(),
    })
}

fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
