//! Row types for the SQLite schema in migrations/0001_init.sql.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PredictionRow {
    pub id: i64,
    pub player: String,
    pub prop: String,
    pub book: String,
    pub odds: i64,
    pub edge: f64,
    pub projection: f64,
    pub evaluated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ArbitrageRow {
    pub id: i64,
    pub player: String,
    pub prop: String,
    pub book1: String,
    pub book2: String,
    pub odds1: i64,
    pub odds2: i64,
    pub profit: f64,
    pub stake_ratio: f64,
    pub evaluated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct OutcomeRow {
    pub id: i64,
    pub player: String,
    pub prop: String,
    pub result: String,
    pub resolved_at: i64,
}

/// Per-prop counts produced by the accuracy query, before accuracy is derived.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PropCountsRow {
    pub prop: String,
    pub predictions: i64,
    pub graded: i64,
    pub wins: i64,
    pub avg_edge: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PropStatsRow {
    pub prop: String,
    pub predictions: i64,
    pub graded: i64,
    pub wins: i64,
    pub accuracy: Option<f64>,
    pub avg_edge: Option<f64>,
    pub last_updated: i64,
}
