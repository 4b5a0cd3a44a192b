use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use crate::types::{ArbitrageOpportunity, Evaluation, Market, SteamMove, ValuePlay};

/// (player, prop)
pub type MarketKey = (String, String);

fn key_of(player: &str, prop: &str) -> MarketKey {
    (player.to_string(), prop.to_string())
}

/// One published evaluation. Built in full before it becomes visible and never mutated after.
#[derive(Debug, Default)]
struct Published {
    value_plays: HashMap<MarketKey, Vec<ValuePlay>>,
    arbitrage: HashMap<MarketKey, Vec<ArbitrageOpportunity>>,
    steam: HashMap<MarketKey, SteamMove>,
    /// Nanosecond timestamp of the evaluation (0 = none).
    evaluated_at_ns: u64,
}

impl Published {
    fn build(evaluation: Evaluation, steam: Vec<SteamMove>) -> Self {
        let mut out = Self { evaluated_at_ns: evaluation.evaluated_at_ns, ..Self::default() };
        for play in evaluation.value_plays {
            out.value_plays.entry(key_of(&play.player, &play.prop)).or_default().push(play);
        }
        for arb in evaluation.arb_opportunities {
            out.arbitrage.entry(key_of(&arb.player, &arb.prop)).or_default().push(arb);
        }
        for m in steam {
            out.steam.insert(key_of(&m.player, &m.prop), m);
        }
        out
    }
}

/// Latest market snapshot and the evaluation computed from it.
///
/// Every publish replaces the previous contents entirely; nothing accumulates across cycles.
/// Readers see either the previous evaluation or the new one, never a mix.
pub struct SnapshotStore {
    markets: DashMap<MarketKey, Market>,
    published: RwLock<Arc<Published>>,
}

impl SnapshotStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Swaps in a new market batch and returns the one it replaced, sorted by (player, prop).
    pub fn replace_markets(&self, markets: Vec<Market>) -> Vec<Market> {
        let previous = self.markets();
        let keys: HashSet<MarketKey> =
            markets.iter().map(|m| key_of(&m.player, &m.prop)).collect();
        for market in markets {
            self.markets.insert(key_of(&market.player, &market.prop), market);
        }
        self.markets.retain(|k, _| keys.contains(k));
        previous
    }

    pub fn publish(&self, evaluation: Evaluation, steam: Vec<SteamMove>) {
        let next = Arc::new(Published::build(evaluation, steam));
        *self.published.write().unwrap_or_else(|e| e.into_inner()) = next;
    }

    fn current(&self) -> Arc<Published> {
        Arc::clone(&self.published.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn markets(&self) -> Vec<Market> {
        let mut out: Vec<Market> = self.markets.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| (&a.player, &a.prop).cmp(&(&b.player, &b.prop)));
        out
    }

    pub fn get_market(&self, player: &str, prop: &str) -> Option<Market> {
        self.markets.get(&key_of(player, prop)).map(|m| m.clone())
    }

    pub fn market_count(&self) -> usize {
        self.markets.len()
    }

    /// Value plays sorted by edge descending, optionally narrowed to one prop and a minimum edge.
    pub fn value_plays(&self, prop: Option<&str>, min_edge: Option<f64>) -> Vec<ValuePlay> {
        let mut out: Vec<ValuePlay> = self
            .current()
            .value_plays
            .iter()
            .filter(|(k, _)| prop.map_or(true, |p| k.1 == p))
            .flat_map(|(_, plays)| plays.iter().cloned())
            .filter(|play| min_edge.map_or(true, |m| play.edge >= m))
            .collect();
        out.sort_by(|a, b| {
            desc(a.edge, b.edge)
                .then_with(|| a.player.cmp(&b.player))
                .then_with(|| a.book.cmp(&b.book))
        });
        out
    }

    /// Arbitrage opportunities sorted by profit descending.
    pub fn arbitrage(&self) -> Vec<ArbitrageOpportunity> {
        let mut out: Vec<ArbitrageOpportunity> =
            self.current().arbitrage.values().flatten().cloned().collect();
        out.sort_by(|a, b| {
            desc(a.profit, b.profit)
                .then_with(|| a.player.cmp(&b.player))
                .then_with(|| a.book1.cmp(&b.book1))
                .then_with(|| a.book2.cmp(&b.book2))
        });
        out
    }

    pub fn steam(&self) -> Vec<SteamMove> {
        let mut out: Vec<SteamMove> = self.current().steam.values().cloned().collect();
        out.sort_by(|a, b| desc(a.avg_shift, b.avg_shift).then_with(|| a.player.cmp(&b.player)));
        out
    }

    pub fn evaluated_at_ns(&self) -> u64 {
        self.current().evaluated_at_ns
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self {
            markets: DashMap::new(),
            published: RwLock::new(Arc::new(Published::default())),
        }
    }
}

fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
