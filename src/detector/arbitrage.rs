//! Cross-book arbitrage within a single (player, prop) market.
//!
//! Two scans:
//! 1. All-pairs: every cross-book pair of one positive and one negative quote whose
//!    combined implied probability leaves a profit above `min_profit`.
//! 2. Best-pair (legacy): the longest underdog price against the shortest favourite,
//!    flagged when `long + (1 - short) < 1 - min_arb_edge`.
//!
//! Legs are always reported long first, so input order never changes the output.

use std::cmp::Ordering;

use tracing::debug;

use crate::detector::odds::implied_probability;
use crate::types::{ArbitrageOpportunity, BookQuote, Market};

pub fn scan_all_pairs(
    markets: &[Market],
    min_profit: f64,
    stake_safety_margin: f64,
) -> Vec<ArbitrageOpportunity> {
    let mut found = Vec::new();

    for market in markets {
        let books = &market.books;
        if books.len() < 2 {
            continue;
        }

        for (i, a) in books.iter().enumerate() {
            for b in &books[i + 1..] {
                if a.bookmaker == b.bookmaker {
                    continue;
                }
                let Some((long, short)) = split_legs(a, b) else {
                    continue;
                };
                let (Ok(p_long), Ok(p_short)) =
                    (implied_probability(long.odds), implied_probability(short.odds))
                else {
                    continue;
                };

                let profit = 1.0 - (p_long + p_short);
                if profit <= min_profit {
                    continue;
                }
                let Some(stake_ratio) = stake_ratio(p_short, p_long, stake_safety_margin) else {
                    continue;
                };

                debug!(
                    player = %market.player,
                    prop = %market.prop,
                    long = %long.bookmaker,
                    short = %short.bookmaker,
                    profit,
                    "arbitrage pair"
                );
                found.push(opportunity(market, long, short, profit, stake_ratio));
            }
        }
    }

    found
}

pub fn scan_best_pair(
    markets: &[Market],
    min_arb_edge: f64,
    stake_safety_margin: f64,
) -> Vec<ArbitrageOpportunity> {
    let threshold = 1.0 - min_arb_edge;
    let mut found = Vec::new();

    for market in markets {
        if market.books.len() < 2 {
            continue;
        }

        // Highest positive price; ties go to the alphabetically first book.
        let long = market
            .books
            .iter()
            .filter(|b| b.odds > 0)
            .max_by(|a, b| a.odds.cmp(&b.odds).then_with(|| b.bookmaker.cmp(&a.bookmaker)));
        // Most negative price; same tie rule.
        let short = market
            .books
            .iter()
            .filter(|b| b.odds < 0)
            .min_by(|a, b| a.odds.cmp(&b.odds).then_with(|| a.bookmaker.cmp(&b.bookmaker)));

        let (Some(long), Some(short)) = (long, short) else {
            continue;
        };
        if long.bookmaker == short.bookmaker {
            continue;
        }
        let (Ok(long_prob), Ok(short_implied)) =
            (implied_probability(long.odds), implied_probability(short.odds))
        else {
            continue;
        };
        let short_prob = 1.0 - short_implied;

        let total = long_prob + short_prob;
        if total >= threshold {
            continue;
        }
        let Some(stake_ratio) = stake_ratio(short_prob, long_prob, stake_safety_margin) else {
            continue;
        };

        found.push(opportunity(market, long, short, 1.0 - total, stake_ratio));
    }

    found
}

/// Orders a pair as (long, short). None unless exactly one side is positive and the other negative.
fn split_legs<'a>(a: &'a BookQuote, b: &'a BookQuote) -> Option<(&'a BookQuote, &'a BookQuote)> {
    match (a.odds.cmp(&0), b.odds.cmp(&0)) {
        (Ordering::Greater, Ordering::Less) => Some((a, b)),
        (Ordering::Less, Ordering::Greater) => Some((b, a)),
        _ => None,
    }
}

/// Short-leg stake per unit on the long leg, shaved by the safety margin.
fn stake_ratio(p_short: f64, p_long: f64, safety_margin: f64) -> Option<f64> {
    if p_long <= 0.0 {
        return None;
    }
    Some(p_short / p_long * (1.0 - safety_margin))
}

fn opportunity(
    market: &Market,
    long: &BookQuote,
    short: &BookQuote,
    profit: f64,
    stake_ratio: f64,
) -> ArbitrageOpportunity {
    ArbitrageOpportunity {
        player: market.player.clone(),
        prop: market.prop.clone(),
        book1: long.bookmaker.clone(),
        book2: short.bookmaker.clone(),
        odds1: long.odds,
        odds2: short.odds,
        profit,
        stake_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(books: &[(&str, i32)]) -> Market {
        Market {
            player: "Aaron Judge".to_string(),
            prop: "hits".to_string(),
            books: books
                .iter()
                .map(|(b, o)| BookQuote { bookmaker: b.to_string(), odds: *o })
                .collect(),
        }
    }

    #[test]
    fn all_pairs_finds_underpriced_pair() {
        let arbs = scan_all_pairs(&[market(&[("fanduel", 120), ("draftkings", -110)])], 0.0, 0.05);
        assert_eq!(arbs.len(), 1);
        let arb = &arbs[0];
        assert_eq!(arb.book1, "fanduel");
        assert_eq!(arb.book2, "draftkings");
        // 1 - (100/220 + 110/210)
        let expected = 1.0 - (100.0 / 220.0 + 110.0 / 210.0);
        assert!((arb.profit - expected).abs() < 1e-12);
        assert!(arb.profit > 0.0);
    }

    #[test]
    fn all_pairs_is_order_insensitive() {
        let forward = scan_all_pairs(&[market(&[("A", 150), ("B", -140)])], 0.0, 0.05);
        let reverse = scan_all_pairs(&[market(&[("B", -140), ("A", 150)])], 0.0, 0.05);
        assert_eq!(forward.len(), 1);
        assert_eq!(forward, reverse);
    }

    #[test]
    fn all_pairs_reports_every_qualifying_pair() {
        let arbs = scan_all_pairs(
            &[market(&[("A", 150), ("B", -140), ("C", 160), ("D", -400)])],
            0.0,
            0.05,
        );
        let pairs: Vec<(&str, &str)> =
            arbs.iter().map(|a| (a.book1.as_str(), a.book2.as_str())).collect();
        // A/D and C/D combine above 1.
        assert_eq!(pairs, vec![("A", "B"), ("C", "B")]);
    }

    #[test]
    fn all_pairs_ignores_same_sign_and_same_book() {
        assert!(scan_all_pairs(&[market(&[("A", 150), ("B", 200)])], 0.0, 0.05).is_empty());
        assert!(scan_all_pairs(&[market(&[("A", -150), ("B", -200)])], 0.0, 0.05).is_empty());
        assert!(scan_all_pairs(&[market(&[("A", 300), ("A", -105)])], 0.0, 0.05).is_empty());
    }

    #[test]
    fn all_pairs_skips_zero_odds() {
        assert!(scan_all_pairs(&[market(&[("A", 0), ("B", -110)])], 0.0, 0.05).is_empty());
    }

    #[test]
    fn single_book_never_arbitrages() {
        for odds in [-10_000, -110, 100, 10_000] {
            assert!(scan_all_pairs(&[market(&[("A", odds)])], 0.0, 0.05).is_empty());
            assert!(scan_best_pair(&[market(&[("A", odds)])], 0.02, 0.05).is_empty());
        }
    }

    #[test]
    fn min_profit_filters_thin_edges() {
        // profit ≈ 0.0217
        let m = [market(&[("fanduel", 120), ("draftkings", -110)])];
        assert_eq!(scan_all_pairs(&m, 0.02, 0.05).len(), 1);
        assert!(scan_all_pairs(&m, 0.03, 0.05).is_empty());
    }

    #[test]
    fn best_pair_matches_reference_scenario() {
        let arbs = scan_best_pair(&[market(&[("FanDuel", 120), ("DraftKings", -110)])], 0.02, 0.05);
        assert_eq!(arbs.len(), 1);
        let arb = &arbs[0];
        assert_eq!(arb.book1, "FanDuel");
        assert_eq!(arb.book2, "DraftKings");
        assert!((arb.profit - 0.0693).abs() < 1e-4, "profit={}", arb.profit);
        let long_prob = 100.0 / 220.0;
        let short_prob = 1.0 - 110.0 / 210.0;
        assert!((arb.stake_ratio - short_prob / long_prob * 0.95).abs() < 1e-12);
    }

    #[test]
    fn best_pair_picks_extremes() {
        let arbs = scan_best_pair(
            &[market(&[("A", 110), ("B", 150), ("C", -105), ("D", -300)])],
            0.02,
            0.05,
        );
        assert_eq!(arbs.len(), 1);
        assert_eq!(arbs[0].book1, "B");
        assert_eq!(arbs[0].book2, "D");
    }

    #[test]
    fn best_pair_needs_both_polarities() {
        assert!(scan_best_pair(&[market(&[("A", 110), ("B", 150)])], 0.02, 0.05).is_empty());
        assert!(scan_best_pair(&[market(&[("A", -110), ("B", -150)])], 0.02, 0.05).is_empty());
    }

    #[test]
    fn best_pair_respects_threshold() {
        // long 0.5 + short (1 - 0.5) = 1.0: no opportunity.
        assert!(scan_best_pair(&[market(&[("A", 100), ("B", -100)])], 0.02, 0.05).is_empty());
    }

    #[test]
    fn best_pair_is_order_insensitive() {
        let forward = scan_best_pair(&[market(&[("A", 150), ("B", -140), ("C", 150)])], 0.02, 0.05);
        let reverse = scan_best_pair(&[market(&[("C", 150), ("B", -140), ("A", 150)])], 0.02, 0.05);
        assert_eq!(forward, reverse);
        assert_eq!(forward[0].book1, "A");
    }
}
