//! Steam moves: coordinated line movement across books between two snapshots.
//!
//! A market steams when at least `min_books` books (never fewer than one) present in both
//! snapshots moved their implied probability the same way by `min_shift` or more, and no book
//! moved that far the other way.

use std::collections::HashMap;

use crate::detector::odds::{implied_probability, round3};
use crate::types::{Market, SteamDirection, SteamMove};

pub fn detect_steam(
    previous: &[Market],
    current: &[Market],
    min_shift: f64,
    min_books: usize,
    timestamp: u64,
) -> Vec<SteamMove> {
    let min_books = min_books.max(1);
    let prev_by_key: HashMap<(&str, &str), &Market> = previous
        .iter()
        .map(|m| ((m.player.as_str(), m.prop.as_str()), m))
        .collect();

    let mut moves = Vec::new();
    for market in current {
        let Some(prev) = prev_by_key.get(&(market.player.as_str(), market.prop.as_str())) else {
            continue;
        };

        let mut shortening: Vec<(&str, f64)> = Vec::new();
        let mut drifting: Vec<(&str, f64)> = Vec::new();

        for book in &market.books {
            let Some(old) = prev.books.iter().find(|b| b.bookmaker == book.bookmaker) else {
                continue;
            };
            let (Ok(p_old), Ok(p_new)) =
                (implied_probability(old.odds), implied_probability(book.odds))
            else {
                continue;
            };
            let shift = p_new - p_old;
            if shift >= min_shift {
                shortening.push((book.bookmaker.as_str(), shift));
            } else if shift <= -min_shift {
                drifting.push((book.bookmaker.as_str(), shift));
            }
        }

        let (direction, movers) = match (shortening.len(), drifting.len()) {
            (n, 0) if n >= min_books => (SteamDirection::Shortening, shortening),
            (0, n) if n >= min_books => (SteamDirection::Drifting, drifting),
            _ => continue,
        };

        let avg_shift = movers.iter().map(|(_, s)| s.abs()).sum::<f64>() / movers.len() as f64;
        let mut books: Vec<String> = movers.into_iter().map(|(b, _)| b.to_string()).collect();
        books.sort();

        moves.push(SteamMove {
            player: market.player.clone(),
            prop: market.prop.clone(),
            direction,
            books,
            avg_shift: round3(avg_shift),
            timestamp,
        });
    }

    moves
}
