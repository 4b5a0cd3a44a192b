use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Prop catalogue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropType {
    BatterHits,
    BatterTotalBases,
    BatterHomeRuns,
    BatterRbis,
    BatterRuns,
    BatterStrikeouts,
    BatterWalks,
    BatterStolenBases,
    BatterHitsRunsRbis,
    PitcherStrikeouts,
    PitcherRecordAWin,
    PitcherHitsAllowed,
    PitcherEarnedRuns,
    PitcherOuts,
}

impl PropType {
    pub const ALL: [PropType; 14] = [
        PropType::BatterHits,
        PropType::BatterTotalBases,
        PropType::BatterHomeRuns,
        PropType::BatterRbis,
        PropType::BatterRuns,
        PropType::BatterStrikeouts,
        PropType::BatterWalks,
        PropType::BatterStolenBases,
        PropType::BatterHitsRunsRbis,
        PropType::PitcherStrikeouts,
        PropType::PitcherRecordAWin,
        PropType::PitcherHitsAllowed,
        PropType::PitcherEarnedRuns,
        PropType::PitcherOuts,
    ];

    /// Market key used by the odds API.
    pub fn api_key(self) -> &'static str {
        match self {
            PropType::BatterHits => "batter_hits",
            PropType::BatterTotalBases => "batter_total_bases",
            PropType::BatterHomeRuns => "batter_home_runs",
            PropType::BatterRbis => "batter_rbis",
            PropType::BatterRuns => "batter_runs",
            PropType::BatterStrikeouts => "batter_strikeouts",
            PropType::BatterWalks => "batter_walks",
            PropType::BatterStolenBases => "batter_stolen_bases",
            PropType::BatterHitsRunsRbis => "batter_hits_runs_rbis",
            PropType::PitcherStrikeouts => "pitcher_strikeouts",
            PropType::PitcherRecordAWin => "pitcher_record_a_win",
            PropType::PitcherHitsAllowed => "pitcher_hits_allowed",
            PropType::PitcherEarnedRuns => "pitcher_earned_runs",
            PropType::PitcherOuts => "pitcher_outs",
        }
    }

    /// Key into `PlayerProjection::stats`, for the props a projection covers.
    pub fn stat_key(self) -> Option<&'static str> {
        match self {
            PropType::BatterHits => Some("hits"),
            PropType::BatterHomeRuns => Some("home_runs"),
            PropType::BatterRbis => Some("rbis"),
            PropType::BatterStrikeouts => Some("strikeouts"),
            PropType::BatterWalks => Some("walks"),
            PropType::BatterStolenBases => Some("steals"),
            _ => None,
        }
    }

    pub fn from_api_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.api_key() == key)
    }

    /// The prop key markets carry: the stats key when one exists, the raw API key otherwise.
    pub fn market_key(api_key: &str) -> String {
        Self::from_api_key(api_key)
            .and_then(PropType::stat_key)
            .unwrap_or(api_key)
            .to_string()
    }
}

impl std::fmt::Display for PropType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.api_key())
    }
}

// ---------------------------------------------------------------------------
// Arbitrage mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbMode {
    /// Every cross-book pair of opposite-sign quotes with positive profit.
    AllPairs,
    /// Legacy: only the best long quote against the shortest favourite.
    BestPair,
}

impl std::str::FromStr for ArbMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all_pairs" | "all-pairs" => Ok(ArbMode::AllPairs),
            "best_pair" | "best-pair" => Ok(ArbMode::BestPair),
            other => Err(AppError::Config(format!(
                "ARB_MODE must be all_pairs or best_pair, got {other:?}"
            ))),
        }
    }
}

impl std::fmt::Display for ArbMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArbMode::AllPairs => write!(f, "all_pairs"),
            ArbMode::BestPair => write!(f, "best_pair"),
        }
    }
}

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// One bookmaker's American odds inside a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookQuote {
    pub bookmaker: String,
    pub odds: i32,
}

/// All quotes for one (player, prop) across bookmakers. The unit the engine evaluates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub player: String,
    #[serde(rename = "type")]
    pub prop: String,
    #[serde(default)]
    pub books: Vec<BookQuote>,
}

/// A single (player, prop, bookmaker) quote as it arrives from a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketQuote {
    pub player: String,
    pub prop: String,
    pub bookmaker: String,
    pub odds: i32,
}

/// Groups flat quotes into markets keyed by (player, prop), keeping first-seen order.
/// A repeated (player, prop, bookmaker) keeps the latest odds.
pub fn group_quotes(quotes: Vec<MarketQuote>) -> Vec<Market> {
    let mut markets: Vec<Market> = Vec::new();
    let mut index: std::collections::HashMap<(String, String), usize> =
        std::collections::HashMap::new();

    for q in quotes {
        let key = (q.player.clone(), q.prop.clone());
        let idx = *index.entry(key).or_insert_with(|| {
            markets.push(Market {
                player: q.player.clone(),
                prop: q.prop.clone(),
                books: Vec::new(),
            });
            markets.len() - 1
        });
        let books = &mut markets[idx].books;
        match books.iter_mut().find(|b| b.bookmaker == q.bookmaker) {
            Some(existing) => existing.odds = q.odds,
            None => books.push(BookQuote { bookmaker: q.bookmaker, odds: q.odds }),
        }
    }

    markets
}

// ---------------------------------------------------------------------------
// Evaluation output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePlay {
    pub player: String,
    pub prop: String,
    pub odds: i32,
    /// Projected minus implied probability, rounded to 3 places.
    pub edge: f64,
    pub book: String,
    /// Scaled projection (stat / 100), rounded to 3 places.
    pub projection: f64,
    /// Nanosecond UTC epoch of the evaluation that produced it.
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub player: String,
    pub prop: String,
    /// The positive-odds (long) leg.
    pub book1: String,
    /// The negative-odds (short) leg.
    pub book2: String,
    pub odds1: i32,
    pub odds2: i32,
    /// 1 - combined implied probability.
    pub profit: f64,
    /// Stake on book2 per unit staked on book1, after the safety margin.
    pub stake_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteamDirection {
    /// Implied probability rising across books (price getting shorter).
    Shortening,
    /// Implied probability falling across books.
    Drifting,
}

impl std::fmt::Display for SteamDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SteamDirection::Shortening => write!(f, "shortening"),
            SteamDirection::Drifting => write!(f, "drifting"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteamMove {
    pub player: String,
    pub prop: String,
    pub direction: SteamDirection,
    pub books: Vec<String>,
    /// Mean absolute implied-probability shift across `books`, rounded to 3 places.
    pub avg_shift: f64,
    pub timestamp: u64,
}

/// One engine run. Each run fully replaces the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub evaluated_at_ns: u64,
    pub value_plays: Vec<ValuePlay>,
    pub arb_opportunities: Vec<ArbitrageOpportunity>,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeResult {
    Win,
    Loss,
    Push,
}

impl std::str::FromStr for OutcomeResult {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "win" => Ok(OutcomeResult::Win),
            "loss" => Ok(OutcomeResult::Loss),
            "push" => Ok(OutcomeResult::Push),
            other => Err(AppError::Validation(format!(
                "result must be win, loss or push, got {other:?}"
            ))),
        }
    }
}

impl std::fmt::Display for OutcomeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutcomeResult::Win => "win",
            OutcomeResult::Loss => "loss",
            OutcomeResult::Push => "push",
        };
        write!(f, "{s}")
    }
}
