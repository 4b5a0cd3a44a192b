//! Player projections built from raw per-player rate stats.
//!
//! Stats are derived once in the constructor and are read-only afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AppError, Result};

/// Raw rate inputs for one player, as supplied by the stats collaborator.
/// Missing numeric fields default to zero.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPlayerStats {
    pub name: String,
    pub team: String,
    pub position: String,
    /// Batting average.
    pub avg: f64,
    /// At-bats.
    pub ab: f64,
    /// Plate appearances.
    pub pa: f64,
    /// Walks.
    pub bb: f64,
    /// Season hits.
    pub hits: f64,
    pub hr_rate: f64,
    pub k_rate: f64,
    pub rbi_rate: f64,
    pub bb_rate: f64,
    pub sb_rate: f64,
    pub last_10_trend: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProjection {
    name: String,
    team: String,
    position: String,
    stats: BTreeMap<String, f64>,
    value_score: f64,
    last_10_trend: f64,
}

impl PlayerProjection {
    pub fn from_raw(raw: RawPlayerStats) -> Result<Self> {
        if raw.name.trim().is_empty() {
            return Err(AppError::Validation("projection row has no player name".to_string()));
        }

        let inputs = [
            ("avg", raw.avg),
            ("ab", raw.ab),
            ("pa", raw.pa),
            ("bb", raw.bb),
            ("hits", raw.hits),
            ("hr_rate", raw.hr_rate),
            ("k_rate", raw.k_rate),
            ("rbi_rate", raw.rbi_rate),
            ("bb_rate", raw.bb_rate),
            ("sb_rate", raw.sb_rate),
        ];
        if let Some((field, value)) = inputs.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(AppError::Validation(format!(
                "{}: {field} must be a non-negative number, got {value}",
                raw.name
            )));
        }

        let mut stats = BTreeMap::new();
        stats.insert("hits".to_string(), raw.avg * raw.ab + raw.bb * 0.25);
        stats.insert("home_runs".to_string(), raw.hr_rate * raw.ab);
        stats.insert("strikeouts".to_string(), raw.k_rate * raw.ab);
        stats.insert("rbis".to_string(), raw.rbi_rate * raw.pa);
        stats.insert("walks".to_string(), raw.bb_rate * raw.pa);
        stats.insert("steals".to_string(), raw.sb_rate * (raw.hits + raw.bb));

        Ok(Self::new(raw.name, raw.team, raw.position, stats)
            .with_trend(raw.last_10_trend.unwrap_or(1.0)))
    }

    /// Builds a projection from already-derived stats.
    pub fn new(
        name: impl Into<String>,
        team: impl Into<String>,
        position: impl Into<String>,
        stats: BTreeMap<String, f64>,
    ) -> Self {
        let value_score = composite_value_score(&stats);
        Self {
            name: name.into(),
            team: team.into(),
            position: position.into(),
            stats,
            value_score,
            last_10_trend: 1.0,
        }
    }

    fn with_trend(mut self, trend: f64) -> Self {
        self.last_10_trend = trend;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn position(&self) -> &str {
        &self.position
    }

    pub fn stats(&self) -> &BTreeMap<String, f64> {
        &self.stats
    }

    /// Projected value for a prop key; zero when the projection does not cover it.
    pub fn stat(&self, prop: &str) -> f64 {
        self.stats.get(prop).copied().unwrap_or(0.0)
    }

    pub fn value_score(&self) -> f64 {
        self.value_score
    }

    pub fn last_10_trend(&self) -> f64 {
        self.last_10_trend
    }
}

/// `(0.3·hits + 0.4·home_runs + 0.3·rbis) × 1.2`. Informational only.
fn composite_value_score(stats: &BTreeMap<String, f64>) -> f64 {
    let get = |k: &str| stats.get(k).copied().unwrap_or(0.0);
    (get("hits") * 0.3 + get("home_runs") * 0.4 + get("rbis") * 0.3) * 1.2
}

/// Parses a JSON array of raw rows. Bad rows are skipped; returns (projections, rejected).
pub fn parse_projections(json: &str) -> Result<(Vec<PlayerProjection>, usize)> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut projections = Vec::with_capacity(rows.len());
    let mut rejected = 0usize;

    for (i, row) in rows.into_iter().enumerate() {
        let built = serde_json::from_value::<RawPlayerStats>(row)
            .map_err(AppError::from)
            .and_then(PlayerProjection::from_raw);
        match built {
            Ok(p) => projections.push(p),
            Err(e) => {
                rejected += 1;
                warn!("[PROJECTIONS] skipping row {i}: {e}");
            }
        }
    }

    Ok((projections, rejected))
}

pub async fn load_projections(path: impl AsRef<Path>) -> Result<Vec<PlayerProjection>> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;
    let (projections, rejected) = parse_projections(&contents)?;
    info!(
        loaded = projections.len(),
        rejected,
        "Loaded {} projections from {} ({} rejected)",
        projections.len(),
        path.display(),
        rejected,
    );
    Ok(projections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawPlayerStats {
        RawPlayerStats {
            name: "Aaron Judge".to_string(),
            team: "NYY".to_string(),
            position: "RF".to_string(),
            avg: 0.3,
            ab: 100.0,
            pa: 120.0,
            bb: 20.0,
            hits: 30.0,
            hr_rate: 0.08,
            k_rate: 0.25,
            rbi_rate: 0.2,
            bb_rate: 0.15,
            sb_rate: 0.1,
            last_10_trend: None,
        }
    }

    #[test]
    fn derives_stats_from_rates() {
        let p = PlayerProjection::from_raw(raw()).unwrap();
        assert!((p.stat("hits") - 35.0).abs() < 1e-9);
        assert!((p.stat("home_runs") - 8.0).abs() < 1e-9);
        assert!((p.stat("strikeouts") - 25.0).abs() < 1e-9);
        assert!((p.stat("rbis") - 24.0).abs() < 1e-9);
        assert!((p.stat("walks") - 18.0).abs() < 1e-9);
        assert!((p.stat("steals") - 5.0).abs() < 1e-9);
        assert_eq!(p.last_10_trend(), 1.0);
    }

    #[test]
    fn value_score_is_weighted_composite() {
        let p = PlayerProjection::from_raw(raw()).unwrap();
        // (35*0.3 + 8*0.4 + 24*0.3) * 1.2 = (10.5 + 3.2 + 7.2) * 1.2
        assert!((p.value_score() - 25.08).abs() < 1e-9);
    }

    #[test]
    fn missing_stat_reads_as_zero() {
        let p = PlayerProjection::from_raw(raw()).unwrap();
        assert_eq!(p.stat("pitcher_outs"), 0.0);
    }

    #[test]
    fn rejects_negative_or_nameless_rows() {
        let mut bad = raw();
        bad.ab = -1.0;
        assert!(matches!(PlayerProjection::from_raw(bad), Err(AppError::Validation(_))));

        let mut nameless = raw();
        nameless.name = "  ".to_string();
        assert!(PlayerProjection::from_raw(nameless).is_err());
    }

    #[test]
    fn parse_skips_bad_rows() {
        let json = r#"[
            {"name": "Aaron Judge", "team": "NYY", "position": "RF", "avg": 0.35, "ab": 100},
            {"name": "", "avg": 0.3},
            {"name": "Bad Types", "avg": "high"},
            {"name": "Juan Soto", "team": "NYM", "position": "LF", "avg": 0.28, "ab": 90, "last_10_trend": 1.2}
        ]"#;
        let (projections, rejected) = parse_projections(json).unwrap();
        assert_eq!(projections.len(), 2);
        assert_eq!(rejected, 2);
        assert!((projections[0].stat("hits") - 35.0).abs() < 1e-9);
        assert_eq!(projections[1].last_10_trend(), 1.2);
    }

    #[test]
    fn parse_fails_on_non_array() {
        assert!(matches!(parse_projections(r#"{"name": "x"}"#), Err(AppError::Json(_))));
    }

    #[tokio::test]
    async fn load_reports_missing_file() {
        let err = load_projections("/nonexistent/projections.json").await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
