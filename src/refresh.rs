use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::Config;
use crate::detector::OddsEvaluationEngine;
use crate::error::Result;
use crate::fetcher::fetch_markets;
use crate::projection::load_projections;
use crate::state::SnapshotStore;
use crate::types::{Evaluation, SteamMove};

/// Periodic fetch → evaluate → publish loop. The first cycle runs immediately.
pub struct OddsRefresher {
    cfg: Config,
    engine: OddsEvaluationEngine,
    store: Arc<SnapshotStore>,
    latency: Arc<LatencyStats>,
    health: Arc<HealthState>,
    eval_tx: mpsc::Sender<Evaluation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub projections: usize,
    pub markets: usize,
    pub value_plays: usize,
    pub arb_opportunities: usize,
    pub steam_moves: usize,
}

impl OddsRefresher {
    pub fn new(
        cfg: Config,
        store: Arc<SnapshotStore>,
        latency: Arc<LatencyStats>,
        health: Arc<HealthState>,
        eval_tx: mpsc::Sender<Evaluation>,
    ) -> Self {
        let engine = OddsEvaluationEngine::new(cfg.engine_config());
        Self { cfg, engine, store, latency, health, eval_tx }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(self.cfg.refresh_interval_secs));

        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh().await {
                error!("Refresh cycle failed: {e}");
            }
        }
    }

    pub async fn refresh(&self) -> Result<CycleSummary> {
        let projections = load_projections(&self.cfg.projections_path).await?;

        let (markets, stats) = match fetch_markets(&self.cfg).await {
            Ok(fetched) => fetched,
            Err(e) => {
                self.health.set_fetch_ok(false);
                return Err(e);
            }
        };
        self.health.set_fetch_ok(true);
        if stats.events_failed > 0
            || stats.rejected_no_player > 0
            || stats.rejected_bad_price > 0
            || stats.rejected_malformed > 0
        {
            warn!(
                events_failed = stats.events_failed,
                rejected_no_player = stats.rejected_no_player,
                rejected_bad_price = stats.rejected_bad_price,
                rejected_malformed = stats.rejected_malformed,
                "fetch dropped part of the batch"
            );
        }

        let previous = self.store.replace_markets(markets.clone());
        let evaluated_at_ns = now_ns();

        let engine = self.engine.clone();
        let started = Instant::now();
        let (evaluation, steam, projection_count, market_count) =
            tokio::task::spawn_blocking(move || {
                let evaluation = engine.evaluate(&projections, &markets, evaluated_at_ns);
                let steam = engine.detect_steam(&previous, &markets, evaluated_at_ns);
                (evaluation, steam, projections.len(), markets.len())
            })
            .await?;
        self.latency.record(started.elapsed());

        let summary = CycleSummary {
            projections: projection_count,
            markets: market_count,
            value_plays: evaluation.value_plays.len(),
            arb_opportunities: evaluation.arb_opportunities.len(),
            steam_moves: steam.len(),
        };

        log_results(&evaluation, &steam);
        self.store.publish(evaluation.clone(), steam);
        self.health.record_cycle(evaluated_at_ns, market_count);

        if !evaluation.value_plays.is_empty() || !evaluation.arb_opportunities.is_empty() {
            self.health.inc_write_queue_pending();
            if let Err(e) = self.eval_tx.try_send(evaluation) {
                self.health.dec_write_queue_pending();
                warn!("Prediction writer channel full: {e}");
            }
        }

        info!(
            projections = summary.projections,
            markets = summary.markets,
            value_plays = summary.value_plays,
            arbs = summary.arb_opportunities,
            steam = summary.steam_moves,
            "Refresh complete: {} value plays, {} arbitrage, {} steam across {} markets",
            summary.value_plays,
            summary.arb_opportunities,
            summary.steam_moves,
            summary.markets,
        );

        Ok(summary)
    }
}

fn log_results(evaluation: &Evaluation, steam: &[SteamMove]) {
    for play in &evaluation.value_plays {
        info!(
            event = "VALUE_PLAY",
            player = %play.player,
            prop = %play.prop,
            book = %play.book,
            odds = play.odds,
            edge = play.edge,
            projection = play.projection,
            "VALUE PLAY | {} {} @ {} {:+} | edge: {:.3}",
            play.player, play.prop, play.book, play.odds, play.edge,
        );
    }
    for arb in &evaluation.arb_opportunities {
        info!(
            event = "ARBITRAGE",
            player = %arb.player,
            prop = %arb.prop,
            book1 = %arb.book1,
            book2 = %arb.book2,
            profit = arb.profit,
            stake_ratio = arb.stake_ratio,
            "ARBITRAGE  | {} {} | {} {:+} vs {} {:+} | profit: {:.4}",
            arb.player, arb.prop, arb.book1, arb.odds1, arb.book2, arb.odds2, arb.profit,
        );
    }
    for m in steam {
        info!(
            event = "STEAM",
            player = %m.player,
            prop = %m.prop,
            direction = %m.direction,
            books = m.books.len(),
            avg_shift = m.avg_shift,
            "STEAM      | {} {} {} across {}",
            m.player, m.prop, m.direction, m.books.join(","),
        );
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
