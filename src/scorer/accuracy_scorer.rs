use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{error, info};

use crate::config::SCORER_INTERVAL_SECS;
use crate::db::models::PropCountsRow;
use crate::error::Result;

/// Background task that grades predictions against recorded outcomes every 60 seconds
/// and rebuilds prop_stats.
pub struct AccuracyScorer {
    pool: sqlx::SqlitePool,
}

impl AccuracyScorer {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(SCORER_INTERVAL_SECS));
        interval.tick().await; // consume immediate first tick

        loop {
            interval.tick().await;
            if let Err(e) = self.score_props().await {
                error!("Scorer error: {e}");
            }
        }
    }

    async fn score_props(&self) -> Result<()> {
        let now_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as i64;

        let rows = prop_counts(&self.pool).await?;
        for row in &rows {
            sqlx::query(
                r#"
                INSERT INTO prop_stats (
                    prop, predictions, graded, wins, accuracy, avg_edge, last_updated
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(prop) DO UPDATE SET
                    predictions = excluded.predictions,
                    graded = excluded.graded,
                    wins = excluded.wins,
                    accuracy = excluded.accuracy,
                    avg_edge = excluded.avg_edge,
                    last_updated = excluded.last_updated
                "#,
            )
            .bind(&row.prop)
            .bind(row.predictions)
            .bind(row.graded)
            .bind(row.wins)
            .bind(accuracy(row.wins, row.graded))
            .bind(row.avg_edge)
            .bind(now_ns)
            .execute(&self.pool)
            .await?;
        }

        info!("Scorer updated stats for {} props", rows.len());
        Ok(())
    }
}

/// Per-prop prediction counts. A play re-emitted across cycles counts once per
/// (player, prop, book, UTC day), keeping its first row. Each counted prediction is graded by
/// the latest outcome recorded for its (player, prop).
pub async fn prop_counts(pool: &sqlx::SqlitePool) -> Result<Vec<PropCountsRow>> {
    let rows = sqlx::query_as::<_, PropCountsRow>(
        r#"
        WITH firsts AS (
            SELECT MIN(id) AS id
            FROM predictions
            GROUP BY player, prop, book, evaluated_at / 86400000000000
        ),
        latest AS (
            SELECT o.player, o.prop, o.result
            FROM outcomes o
            WHERE o.id = (
                SELECT MAX(o2.id) FROM outcomes o2
                WHERE o2.player = o.player AND o2.prop = o.prop
            )
        )
        SELECT
            p.prop AS prop,
            COUNT(*) AS predictions,
            COUNT(l.result) AS graded,
            COALESCE(SUM(CASE WHEN l.result = 'win' THEN 1 ELSE 0 END), 0) AS wins,
            AVG(p.edge) AS avg_edge
        FROM predictions p
        JOIN firsts f ON f.id = p.id
        LEFT JOIN latest l ON l.player = p.player AND l.prop = p.prop
        GROUP BY p.prop
        ORDER BY p.prop
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropAccuracy {
    pub prop: String,
    pub predictions: i64,
    pub graded: i64,
    pub wins: i64,
    pub accuracy: Option<f64>,
    pub avg_edge: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracySummary {
    pub predictions: i64,
    pub graded: i64,
    pub wins: i64,
    /// Wins over graded predictions. None until something is graded.
    pub accuracy: Option<f64>,
    pub by_prop: Vec<PropAccuracy>,
}

/// Wins over graded; pushes count as graded but not correct.
pub fn accuracy(wins: i64, graded: i64) -> Option<f64> {
    (graded > 0).then(|| wins as f64 / graded as f64)
}

pub fn summarize(rows: Vec<PropCountsRow>) -> AccuracySummary {
    let predictions = rows.iter().map(|r| r.predictions).sum();
    let graded = rows.iter().map(|r| r.graded).sum();
    let wins = rows.iter().map(|r| r.wins).sum();

    let by_prop = rows
        .into_iter()
        .map(|r| PropAccuracy {
            accuracy: accuracy(r.wins, r.graded),
            prop: r.prop,
            predictions: r.predictions,
            graded: r.graded,
            wins: r.wins,
            avg_edge: r.avg_edge,
        })
        .collect();

    AccuracySummary { predictions, graded, wins, accuracy: accuracy(wins, graded), by_prop }
}

pub async fn accuracy_summary(pool: &sqlx::SqlitePool) -> Result<AccuracySummary> {
    Ok(summarize(prop_counts(pool).await?))
}
