use crate::config::thresholds;
use crate::detector::{arbitrage, steam, value};
use crate::projection::PlayerProjection;
use crate::types::{ArbMode, ArbitrageOpportunity, Evaluation, Market, SteamMove, ValuePlay};

/// Thresholds the engine runs with. Passed in at construction; the engine holds no other state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub min_edge: f64,
    pub min_arb_edge: f64,
    pub min_arb_profit: f64,
    pub stake_safety_margin: f64,
    pub arb_mode: ArbMode,
    pub steam_min_shift: f64,
    pub steam_min_books: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_edge: thresholds::MIN_EDGE,
            min_arb_edge: thresholds::MIN_ARB_EDGE,
            min_arb_profit: thresholds::MIN_ARB_PROFIT,
            stake_safety_margin: thresholds::STAKE_SAFETY_MARGIN,
            arb_mode: ArbMode::AllPairs,
            steam_min_shift: thresholds::STEAM_MIN_SHIFT,
            steam_min_books: thresholds::STEAM_MIN_BOOKS,
        }
    }
}

/// Turns projections plus a market snapshot into value plays and arbitrage opportunities.
/// Pure: no I/O, no mutation of inputs, identical inputs give identical output.
#[derive(Debug, Clone, Default)]
pub struct OddsEvaluationEngine {
    cfg: EngineConfig,
}

impl OddsEvaluationEngine {
    pub fn new(cfg: EngineConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn evaluate(
        &self,
        projections: &[PlayerProjection],
        markets: &[Market],
        evaluated_at_ns: u64,
    ) -> Evaluation {
        Evaluation {
            evaluated_at_ns,
            value_plays: self.evaluate_value_plays(projections, markets, evaluated_at_ns),
            arb_opportunities: self.evaluate_arbitrage(markets),
        }
    }

    pub fn evaluate_value_plays(
        &self,
        projections: &[PlayerProjection],
        markets: &[Market],
        timestamp: u64,
    ) -> Vec<ValuePlay> {
        value::scan_value_plays(projections, markets, self.cfg.min_edge, timestamp)
    }

    pub fn evaluate_arbitrage(&self, markets: &[Market]) -> Vec<ArbitrageOpportunity> {
        match self.cfg.arb_mode {
            ArbMode::AllPairs => arbitrage::scan_all_pairs(
                markets,
                self.cfg.min_arb_profit,
                self.cfg.stake_safety_margin,
            ),
            ArbMode::BestPair => arbitrage::scan_best_pair(
                markets,
                self.cfg.min_arb_edge,
                self.cfg.stake_safety_margin,
            ),
        }
    }

    pub fn detect_steam(
        &self,
        previous: &[Market],
        current: &[Market],
        timestamp: u64,
    ) -> Vec<SteamMove> {
        steam::detect_steam(
            previous,
            current,
            self.cfg.steam_min_shift,
            self.cfg.steam_min_books,
            timestamp,
        )
    }
}
