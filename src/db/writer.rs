use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::api::health::HealthState;
use crate::db::models::{OutcomeRow, PredictionRow};
use crate::error::Result;
use crate::types::{Evaluation, OutcomeResult};

/// Receives evaluations from the refresh loop and persists their value plays and
/// arbitrage opportunities. Runs as a dedicated background task so evaluation never waits on disk.
pub struct PredictionWriter {
    pool: sqlx::SqlitePool,
    eval_rx: mpsc::Receiver<Evaluation>,
    health: Arc<HealthState>,
}

impl PredictionWriter {
    pub fn new(
        pool: sqlx::SqlitePool,
        eval_rx: mpsc::Receiver<Evaluation>,
        health: Arc<HealthState>,
    ) -> Self {
        Self { pool, eval_rx, health }
    }

    pub async fn run(mut self) {
        while let Some(evaluation) = self.eval_rx.recv().await {
            match write_evaluation(&self.pool, &evaluation).await {
                Ok((plays, arbs)) => debug!(plays, arbs, "persisted evaluation"),
                Err(e) => error!("DB write error: {e}"),
            }
            self.health.dec_write_queue_pending();
        }
    }
}

/// Writes one evaluation in a single transaction. Returns (predictions, arbitrage rows) inserted.
pub async fn write_evaluation(
    pool: &sqlx::SqlitePool,
    evaluation: &Evaluation,
) -> Result<(usize, usize)> {
    let evaluated_at = evaluation.evaluated_at_ns as i64;
    let mut tx = pool.begin().await?;

    for play in &evaluation.value_plays {
        sqlx::query(
            r#"
            INSERT INTO predictions (player, prop, book, odds, edge, projection, evaluated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&play.player)
        .bind(&play.prop)
        .bind(&play.book)
        .bind(i64::from(play.odds))
        .bind(play.edge)
        .bind(play.projection)
        .bind(evaluated_at)
        .execute(&mut *tx)
        .await?;
    }

    for arb in &evaluation.arb_opportunities {
        sqlx::query(
            r#"
            INSERT INTO arbitrage_opportunities (
                player, prop, book1, book2, odds1, odds2, profit, stake_ratio, evaluated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&arb.player)
        .bind(&arb.prop)
        .bind(&arb.book1)
        .bind(&arb.book2)
        .bind(i64::from(arb.odds1))
        .bind(i64::from(arb.odds2))
        .bind(arb.profit)
        .bind(arb.stake_ratio)
        .bind(evaluated_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok((evaluation.value_plays.len(), evaluation.arb_opportunities.len()))
}

pub async fn insert_outcome(
    pool: &sqlx::SqlitePool,
    player: &str,
    prop: &str,
    result: OutcomeResult,
    resolved_at_ns: u64,
) -> Result<OutcomeRow> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        r#"
        INSERT INTO outcomes (player, prop, result, resolved_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, player, prop, result, resolved_at
        "#,
    )
    .bind(player)
    .bind(prop)
    .bind(result.to_string())
    .bind(resolved_at_ns as i64)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Newest first.
pub async fn recent_predictions(pool: &sqlx::SqlitePool, limit: i64) -> Result<Vec<PredictionRow>> {
    let rows = sqlx::query_as::<_, PredictionRow>(
        r#"
        SELECT id, player, prop, book, odds, edge, projection, evaluated_at
        FROM predictions
        ORDER BY evaluated_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
