use crate::detector::EngineConfig;
use crate::error::{AppError, Result};
use crate::types::{ArbMode, PropType};

pub const ODDS_API_URL: &str = "https://api.the-odds-api.com/v4";
pub const DEFAULT_SPORT: &str = "baseball_mlb";
pub const DEFAULT_SPORTSBOOKS: &str = "fanduel,draftkings,betmgm,pointsbet";

/// Channel capacity for evaluation results handed to the DB writer.
pub const CHANNEL_CAPACITY: usize = 256;

/// Accuracy scorer update interval (seconds).
pub const SCORER_INTERVAL_SECS: u64 = 60;

/// Max concurrent per-event odds requests during one fetch.
pub const FETCH_CONCURRENCY: usize = 4;

/// Edge and arbitrage thresholds used when the environment does not override them.
pub mod thresholds {
    /// Projected minus implied probability a value play must strictly exceed.
    pub const MIN_EDGE: f64 = 0.05;
    /// Best-pair mode: combined probability must be below `1 - MIN_ARB_EDGE` (0.98).
    pub const MIN_ARB_EDGE: f64 = 0.02;
    /// All-pairs mode: profit must strictly exceed this.
    pub const MIN_ARB_PROFIT: f64 = 0.0;
    /// Fraction shaved off the fair stake split.
    pub const STAKE_SAFETY_MARGIN: f64 = 0.05;
    /// Minimum implied-probability move for a book to count toward a steam move.
    pub const STEAM_MIN_SHIFT: f64 = 0.03;
    pub const STEAM_MIN_BOOKS: usize = 2;
}

#[derive(Debug, Clone)]
pub struct Config {
    /// The Odds API key (ODDS_API_KEY). When unset, MARKETS_SNAPSHOT_PATH is required.
    pub odds_api_key: Option<String>,
    pub odds_api_url: String,
    pub sport: String,
    pub regions: String,
    /// Bookmaker keys to request (SPORTSBOOKS, comma-separated).
    pub sportsbooks: Vec<String>,
    /// Prop market keys to request (PROP_MARKETS, comma-separated).
    pub prop_markets: Vec<String>,
    /// Offline market batch: JSON array of {player, type, books} (MARKETS_SNAPSHOT_PATH).
    pub markets_snapshot_path: Option<String>,
    pub projections_path: String,
    pub min_edge: f64,
    pub min_arb_edge: f64,
    pub min_arb_profit: f64,
    pub stake_safety_margin: f64,
    pub arb_mode: ArbMode,
    pub steam_min_shift: f64,
    pub steam_min_books: usize,
    pub refresh_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cfg = Self {
            odds_api_key: var("ODDS_API_KEY"),
            odds_api_url: var("ODDS_API_URL").unwrap_or_else(|| ODDS_API_URL.to_string()),
            sport: var("ODDS_SPORT").unwrap_or_else(|| DEFAULT_SPORT.to_string()),
            regions: var("ODDS_REGIONS").unwrap_or_else(|| "us".to_string()),
            sportsbooks: split_list(
                &var("SPORTSBOOKS").unwrap_or_else(|| DEFAULT_SPORTSBOOKS.to_string()),
            ),
            prop_markets: match var("PROP_MARKETS") {
                Some(raw) => split_list(&raw),
                None => PropType::ALL.iter().map(|p| p.api_key().to_string()).collect(),
            },
            markets_snapshot_path: var("MARKETS_SNAPSHOT_PATH"),
            projections_path: var("PROJECTIONS_PATH")
                .unwrap_or_else(|| "projections.json".to_string()),
            min_edge: parse_fraction(var("MIN_EDGE"), "MIN_EDGE", thresholds::MIN_EDGE)?,
            min_arb_edge: parse_fraction(
                var("MIN_ARB_EDGE"),
                "MIN_ARB_EDGE",
                thresholds::MIN_ARB_EDGE,
            )?,
            min_arb_profit: parse_fraction(
                var("MIN_ARB_PROFIT"),
                "MIN_ARB_PROFIT",
                thresholds::MIN_ARB_PROFIT,
            )?,
            stake_safety_margin: parse_fraction(
                var("STAKE_SAFETY_MARGIN"),
                "STAKE_SAFETY_MARGIN",
                thresholds::STAKE_SAFETY_MARGIN,
            )?,
            arb_mode: match var("ARB_MODE") {
                Some(raw) => raw.parse::<ArbMode>()?,
                None => ArbMode::AllPairs,
            },
            steam_min_shift: parse_fraction(
                var("STEAM_MIN_SHIFT"),
                "STEAM_MIN_SHIFT",
                thresholds::STEAM_MIN_SHIFT,
            )?,
            steam_min_books: var("STEAM_MIN_BOOKS")
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n >= 1)
                .unwrap_or(thresholds::STEAM_MIN_BOOKS),
            refresh_interval_secs: var("REFRESH_INTERVAL_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(300),
            fetch_timeout_secs: var("FETCH_TIMEOUT_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(10),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            db_path: var("DB_PATH").unwrap_or_else(|| "predictions.db".to_string()),
            api_port: var("API_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
        };

        if cfg.odds_api_key.is_none() && cfg.markets_snapshot_path.is_none() {
            return Err(AppError::Config(
                "either ODDS_API_KEY or MARKETS_SNAPSHOT_PATH must be set".to_string(),
            ));
        }

        Ok(cfg)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            min_edge: self.min_edge,
            min_arb_edge: self.min_arb_edge,
            min_arb_profit: self.min_arb_profit,
            stake_safety_margin: self.stake_safety_margin,
            arb_mode: self.arb_mode,
            steam_min_shift: self.steam_min_shift,
            steam_min_books: self.steam_min_books,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Thresholds are probabilities or probability differences, so they must sit in [0, 1).
fn parse_fraction(raw: Option<String>, key: &str, default: f64) -> Result<f64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| AppError::Config(format!("{key} must be a number, got {raw:?}")))?;
    if !value.is_finite() || !(0.0..1.0).contains(&value) {
        return Err(AppError::Config(format!("{key} must be in [0, 1), got {value}")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_thresholds() {
        let cfg = config_from(&[("ODDS_API_KEY", "k")]).unwrap();
        assert_eq!(cfg.min_edge, 0.05);
        assert_eq!(cfg.min_arb_edge, 0.02);
        assert_eq!(cfg.arb_mode, ArbMode::AllPairs);
        assert_eq!(cfg.refresh_interval_secs, 300);
        assert_eq!(cfg.api_port, 3000);
        assert_eq!(
            cfg.sportsbooks,
            vec!["fanduel", "draftkings", "betmgm", "pointsbet"]
        );
        assert_eq!(cfg.prop_markets.len(), PropType::ALL.len());
    }

    #[test]
    fn requires_a_market_source() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let cfg = config_from(&[("MARKETS_SNAPSHOT_PATH", "markets.json")]).unwrap();
        assert!(cfg.odds_api_key.is_none());
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = config_from(&[("ODDS_API_KEY", "k"), ("MIN_EDGE", "  ")]).unwrap();
        assert_eq!(cfg.min_edge, 0.05);
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        assert!(config_from(&[("ODDS_API_KEY", "k"), ("MIN_EDGE", "1.5")]).is_err());
        assert!(config_from(&[("ODDS_API_KEY", "k"), ("MIN_EDGE", "-0.1")]).is_err());
        assert!(config_from(&[("ODDS_API_KEY", "k"), ("MIN_EDGE", "abc")]).is_err());
    }

    #[test]
    fn parses_arb_mode_and_lists() {
        let cfg = config_from(&[
            ("ODDS_API_KEY", "k"),
            ("ARB_MODE", "best_pair"),
            ("SPORTSBOOKS", "fanduel, draftkings,,"),
            ("PROP_MARKETS", "batter_hits"),
        ])
        .unwrap();
        assert_eq!(cfg.arb_mode, ArbMode::BestPair);
        assert_eq!(cfg.sportsbooks, vec!["fanduel", "draftkings"]);
        assert_eq!(cfg.prop_markets, vec!["batter_hits"]);
    }

    #[test]
    fn rejects_bad_port() {
        assert!(config_from(&[("ODDS_API_KEY", "k"), ("API_PORT", "99999")]).is_err());
    }

    #[test]
    fn engine_config_carries_thresholds() {
        let cfg = config_from(&[("ODDS_API_KEY", "k"), ("MIN_EDGE", "0.08")]).unwrap();
        let engine = cfg.engine_config();
        assert_eq!(engine.min_edge, 0.08);
        assert_eq!(engine.stake_safety_margin, 0.05);
    }
}
