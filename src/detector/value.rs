use std::collections::HashMap;

use tracing::debug;

use crate::detector::odds::{implied_probability, round3};
use crate::projection::PlayerProjection;
use crate::types::{Market, ValuePlay};

/// Projection stats are stored on a 0–100 scale and divided down to a probability-like value.
pub const STAT_SCALE: f64 = 100.0;

/// Flags every quote whose scaled projection beats its implied probability by more than
/// `min_edge`. Markets without a matching projection are skipped.
pub fn scan_value_plays(
    projections: &[PlayerProjection],
    markets: &[Market],
    min_edge: f64,
    timestamp: u64,
) -> Vec<ValuePlay> {
    // First projection wins on duplicate names.
    let mut by_name: HashMap<&str, &PlayerProjection> = HashMap::with_capacity(projections.len());
    for p in projections {
        by_name.entry(p.name()).or_insert(p);
    }

    let mut plays = Vec::new();
    for market in markets {
        let Some(projection) = by_name.get(market.player.as_str()) else {
            continue;
        };
        plays.extend(value_plays_for_market(projection, market, min_edge, timestamp));
    }
    plays
}

fn value_plays_for_market(
    projection: &PlayerProjection,
    market: &Market,
    min_edge: f64,
    timestamp: u64,
) -> Vec<ValuePlay> {
    let stat_projection = projection.stat(&market.prop) / STAT_SCALE;

    market
        .books
        .iter()
        .filter_map(|book| {
            let implied = match implied_probability(book.odds) {
                Ok(p) => p,
                Err(e) => {
                    debug!(
                        player = %market.player,
                        prop = %market.prop,
                        book = %book.bookmaker,
                        "skipping quote: {e}"
                    );
                    return None;
                }
            };

            (stat_projection > implied + min_edge).then(|| ValuePlay {
                player: market.player.clone(),
                prop: market.prop.clone(),
                odds: book.odds,
                edge: round3(stat_projection - implied),
                book: book.bookmaker.clone(),
                projection: round3(stat_projection),
                timestamp,
            })
        })
        .collect()
}
