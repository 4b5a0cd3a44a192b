mod api;
mod config;
mod db;
mod detector;
mod error;
mod fetcher;
mod projection;
mod refresh;
mod scorer;
mod state;
mod types;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::{router, ApiState, HealthState, LatencyStats};
use crate::config::{Config, CHANNEL_CAPACITY};
use crate::db::PredictionWriter;
use crate::error::Result;
use crate::refresh::OddsRefresher;
use crate::scorer::AccuracyScorer;
use crate::state::SnapshotStore;
use crate::types::Evaluation;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    match (&cfg.markets_snapshot_path, &cfg.odds_api_key) {
        (Some(path), _) => info!("Market source: snapshot file {path}"),
        (None, Some(_)) => info!(
            "Market source: {} ({}, books: {})",
            cfg.odds_api_url,
            cfg.sport,
            cfg.sportsbooks.join(","),
        ),
        (None, None) => warn!("No market source configured"),
    }
    info!(
        min_edge = cfg.min_edge,
        arb_mode = %cfg.arb_mode,
        min_arb_edge = cfg.min_arb_edge,
        min_arb_profit = cfg.min_arb_profit,
        refresh_secs = cfg.refresh_interval_secs,
        "Engine thresholds loaded"
    );

    // --- Shared state ---
    let store = SnapshotStore::new();
    let latency = Arc::new(LatencyStats::new()?);
    let health = Arc::new(HealthState::new());

    // --- Channels ---
    let (eval_tx, eval_rx) = mpsc::channel::<Evaluation>(CHANNEL_CAPACITY);

    // --- Spawn tasks ---

    // Prediction writer
    let writer = PredictionWriter::new(pool.clone(), eval_rx, Arc::clone(&health));
    tokio::spawn(async move { writer.run().await });

    // Accuracy scorer (background, every 60s)
    let scorer = AccuracyScorer::new(pool.clone());
    tokio::spawn(async move { scorer.run().await });

    // Odds refresher (first cycle immediately, then every REFRESH_INTERVAL_SECS)
    let refresher = OddsRefresher::new(
        cfg.clone(),
        Arc::clone(&store),
        Arc::clone(&latency),
        Arc::clone(&health),
        eval_tx,
    );
    tokio::spawn(async move { refresher.run().await });

    // HTTP API server
    let api_state = ApiState { pool, store, latency, health };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
