use std::path::Path;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{Config, FETCH_CONCURRENCY};
use crate::error::{AppError, Result};
use crate::types::{group_quotes, BookQuote, Market, MarketQuote, PropType};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchStats {
    pub events_total: usize,
    pub events_failed: usize,
    pub outcomes_total: usize,
    pub skipped_not_over: usize,
    pub rejected_no_player: usize,
    pub rejected_bad_price: usize,
    pub rejected_malformed: usize,
    pub quotes: usize,
    pub markets: usize,
}

#[derive(Debug, Deserialize)]
struct OddsEvent {
    id: String,
    #[serde(default)]
    home_team: String,
    #[serde(default)]
    away_team: String,
}

#[derive(Debug, Default, Deserialize)]
struct EventOdds {
    #[serde(default)]
    bookmakers: Vec<OddsBookmaker>,
}

#[derive(Debug, Deserialize)]
struct OddsBookmaker {
    key: String,
    #[serde(default)]
    markets: Vec<OddsMarket>,
}

#[derive(Debug, Deserialize)]
struct OddsMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<OddsOutcome>,
}

#[derive(Debug, Deserialize)]
struct OddsOutcome {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    price: Option<f64>,
}

/// Pulls one market batch. A configured snapshot file takes precedence over the live API.
pub async fn fetch_markets(cfg: &Config) -> Result<(Vec<Market>, FetchStats)> {
    if let Some(path) = &cfg.markets_snapshot_path {
        return load_snapshot(path).await;
    }

    let api_key = cfg
        .odds_api_key
        .as_deref()
        .ok_or_else(|| AppError::Config("ODDS_API_KEY is not set".to_string()))?;
    fetch_from_api(cfg, api_key).await
}

async fn fetch_from_api(cfg: &Config, api_key: &str) -> Result<(Vec<Market>, FetchStats)> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
        .build()?;

    let events_url = format!("{}/sports/{}/events", cfg.odds_api_url, cfg.sport);
    let resp: serde_json::Value = client
        .get(&events_url)
        .query(&[("apiKey", api_key)])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let events = parse_events(&resp)?;

    let mut stats = FetchStats { events_total: events.len(), ..FetchStats::default() };
    debug!(events = events.len(), sport = %cfg.sport, "listed events");

    let markets_param = cfg.prop_markets.join(",");
    let bookmakers_param = cfg.sportsbooks.join(",");

    // `buffered` keeps event order so identical API state gives identical batches.
    let responses: Vec<(OddsEvent, Result<EventOdds>)> = stream::iter(events)
        .map(|event| {
            let client = &client;
            let markets_param = markets_param.as_str();
            let bookmakers_param = bookmakers_param.as_str();
            async move {
                let url = format!(
                    "{}/sports/{}/events/{}/odds",
                    cfg.odds_api_url, cfg.sport, event.id
                );
                let odds = fetch_event_odds(
                    client,
                    &url,
                    &[
                        ("apiKey", api_key),
                        ("regions", cfg.regions.as_str()),
                        ("markets", markets_param),
                        ("oddsFormat", "american"),
                        ("bookmakers", bookmakers_param),
                    ],
                )
                .await;
                (event, odds)
            }
        })
        .buffered(FETCH_CONCURRENCY)
        .collect()
        .await;

    let mut quotes = Vec::new();
    for (event, odds) in responses {
        match odds {
            Ok(odds) => quotes.extend(event_quotes(&odds, &mut stats)),
            Err(e) => {
                stats.events_failed += 1;
                warn!(
                    event_id = %event.id,
                    matchup = %format!("{} @ {}", event.away_team, event.home_team),
                    "event odds request failed: {e}"
                );
            }
        }
    }

    stats.quotes = quotes.len();
    let markets = group_quotes(quotes);
    stats.markets = markets.len();
    Ok((markets, stats))
}

async fn fetch_event_odds(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<EventOdds> {
    let odds = client
        .get(url)
        .query(query)
        .send()
        .await?
        .error_for_status()?
        .json::<EventOdds>()
        .await?;
    Ok(odds)
}

/// Events listing must be a JSON array; entries without an id are dropped.
fn parse_events(v: &serde_json::Value) -> Result<Vec<OddsEvent>> {
    let items = v
        .as_array()
        .ok_or_else(|| AppError::Fetch("events response was not an array".to_string()))?;

    Ok(items
        .iter()
        .filter_map(|item| serde_json::from_value::<OddsEvent>(item.clone()).ok())
        .filter(|e| !e.id.is_empty())
        .collect())
}

/// Flattens one event's odds into "Over" quotes keyed by the player in `description`.
fn event_quotes(odds: &EventOdds, stats: &mut FetchStats) -> Vec<MarketQuote> {
    let mut quotes = Vec::new();

    for bookmaker in &odds.bookmakers {
        for market in &bookmaker.markets {
            let prop = PropType::market_key(&market.key);
            for outcome in &market.outcomes {
                stats.outcomes_total += 1;

                if !outcome.name.eq_ignore_ascii_case("over") {
                    stats.skipped_not_over += 1;
                    continue;
                }
                let Some(player) = outcome
                    .description
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                else {
                    stats.rejected_no_player += 1;
                    continue;
                };
                let Some(odds) = outcome.price.and_then(american_price) else {
                    stats.rejected_bad_price += 1;
                    continue;
                };

                quotes.push(MarketQuote {
                    player: player.to_string(),
                    prop: prop.clone(),
                    bookmaker: bookmaker.key.clone(),
                    odds,
                });
            }
        }
    }

    quotes
}

/// American prices are non-zero integers. Anything else is dropped.
fn american_price(price: f64) -> Option<i32> {
    if !price.is_finite() || price.fract() != 0.0 || price == 0.0 {
        return None;
    }
    if price < i32::MIN as f64 || price > i32::MAX as f64 {
        return None;
    }
    Some(price as i32)
}

/// Reads a JSON array of `{player, type, books}` markets from disk.
pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<(Vec<Market>, FetchStats)> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await?;
    let (markets, stats) = parse_snapshot(&raw)?;
    info!(path = %path.display(), markets = markets.len(), "loaded market snapshot");
    Ok((markets, stats))
}

#[derive(Debug, Deserialize)]
struct SnapshotMarket {
    player: String,
    #[serde(rename = "type")]
    prop: String,
    #[serde(default)]
    books: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SnapshotBook {
    bookmaker: String,
    odds: f64,
}

/// The payload must be an array. Each market and each book inside it is validated on its own;
/// malformed entries are counted and dropped.
pub fn parse_snapshot(json: &str) -> Result<(Vec<Market>, FetchStats)> {
    let items: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut stats = FetchStats::default();
    let mut markets = Vec::with_capacity(items.len());

    for (idx, item) in items.into_iter().enumerate() {
        let raw = match serde_json::from_value::<SnapshotMarket>(item) {
            Ok(raw) => raw,
            Err(e) => {
                stats.rejected_malformed += 1;
                warn!(index = idx, "skipping malformed snapshot market: {e}");
                continue;
            }
        };
        let player = raw.player.trim();
        if player.is_empty() {
            stats.rejected_no_player += 1;
            warn!(index = idx, "skipping snapshot market without a player");
            continue;
        }

        let mut books = Vec::with_capacity(raw.books.len());
        for book in raw.books {
            stats.outcomes_total += 1;
            let book = match serde_json::from_value::<SnapshotBook>(book) {
                Ok(book) if !book.bookmaker.trim().is_empty() => book,
                Ok(_) => {
                    stats.rejected_malformed += 1;
                    warn!(player, prop = %raw.prop, "skipping book without a bookmaker");
                    continue;
                }
                Err(e) => {
                    stats.rejected_malformed += 1;
                    warn!(player, prop = %raw.prop, "skipping malformed book: {e}");
                    continue;
                }
            };
            let Some(odds) = american_price(book.odds) else {
                stats.rejected_bad_price += 1;
                warn!(
                    player,
                    prop = %raw.prop,
                    bookmaker = %book.bookmaker,
                    odds = book.odds,
                    "skipping bad price"
                );
                continue;
            };
            books.push(BookQuote { bookmaker: book.bookmaker, odds });
        }

        stats.quotes += books.len();
        markets.push(Market { player: player.to_string(), prop: raw.prop, books });
    }

    stats.markets = markets.len();
    Ok((markets, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT_ODDS: &str = r#"{
        "id": "abc123",
        "home_team": "New York Yankees",
        "away_team": "Boston Red Sox",
        "bookmakers": [
            {
                "key": "fanduel",
                "title": "FanDuel",
                "markets": [
                    {
                        "key": "batter_hits",
                        "outcomes": [
                            {"name": "Over", "description": "Aaron Judge", "price": 120, "point": 0.5},
                            {"name": "Under", "description": "Aaron Judge", "price": -150, "point": 0.5},
                            {"name": "Over", "description": "Rafael Devers", "price": -135, "point": 0.5}
                        ]
                    },
                    {
                        "key": "pitcher_outs",
                        "outcomes": [
                            {"name": "Over", "description": "Gerrit Cole", "price": -115, "point": 17.5}
                        ]
                    }
                ]
            },
            {
                "key": "draftkings",
                "markets": [
                    {
                        "key": "batter_hits",
                        "outcomes": [
                            {"name": "Over", "description": "Aaron Judge", "price": -110},
                            {"name": "Over", "price": 105},
                            {"name": "Over", "description": "Rafael Devers", "price": 1.91}
                        ]
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn event_quotes_keeps_over_outcomes_with_players() {
        let odds: EventOdds = serde_json::from_str(EVENT_ODDS).unwrap();
        let mut stats = FetchStats::default();
        let quotes = event_quotes(&odds, &mut stats);

        assert_eq!(quotes.len(), 4);
        assert_eq!(stats.outcomes_total, 7);
        assert_eq!(stats.skipped_not_over, 1);
        assert_eq!(stats.rejected_no_player, 1);
        assert_eq!(stats.rejected_bad_price, 1);

        let judge_fd = &quotes[0];
        assert_eq!(judge_fd.player, "Aaron Judge");
        assert_eq!(judge_fd.prop, "hits");
        assert_eq!(judge_fd.bookmaker, "fanduel");
        assert_eq!(judge_fd.odds, 120);
    }

    #[test]
    fn unmapped_market_keeps_api_key() {
        let odds: EventOdds = serde_json::from_str(EVENT_ODDS).unwrap();
        let quotes = event_quotes(&odds, &mut FetchStats::default());
        let cole = quotes.iter().find(|q| q.player == "Gerrit Cole").unwrap();
        assert_eq!(cole.prop, "pitcher_outs");
    }

    #[test]
    fn quotes_group_into_markets_across_books() {
        let odds: EventOdds = serde_json::from_str(EVENT_ODDS).unwrap();
        let markets = group_quotes(event_quotes(&odds, &mut FetchStats::default()));

        let judge = markets
            .iter()
            .find(|m| m.player == "Aaron Judge" && m.prop == "hits")
            .unwrap();
        let books: Vec<(&str, i32)> =
            judge.books.iter().map(|b| (b.bookmaker.as_str(), b.odds)).collect();
        assert_eq!(books, vec![("fanduel", 120), ("draftkings", -110)]);
    }

    #[test]
    fn event_without_bookmakers_yields_nothing() {
        let odds: EventOdds = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(event_quotes(&odds, &mut FetchStats::default()).is_empty());
    }

    #[test]
    fn parse_events_requires_array() {
        let err = parse_events(&serde_json::json!({"message": "quota exceeded"})).unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
    }

    #[test]
    fn parse_events_drops_entries_without_id() {
        let events = parse_events(&serde_json::json!([
            {"id": "a", "home_team": "NYY", "away_team": "BOS"},
            {"home_team": "LAD"},
            {"id": ""}
        ]))
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "a");
    }

    #[test]
    fn american_price_rejects_non_integers_and_zero() {
        assert_eq!(american_price(120.0), Some(120));
        assert_eq!(american_price(-110.0), Some(-110));
        assert_eq!(american_price(1.91), None);
        assert_eq!(american_price(0.0), None);
        assert_eq!(american_price(f64::NAN), None);
        assert_eq!(american_price(1e12), None);
    }

    #[test]
    fn snapshot_parses_market_records() {
        let (markets, stats) = parse_snapshot(
            r#"[
                {"player":"Aaron Judge","type":"hits","books":[
                    {"bookmaker":"fanduel","odds":120},
                    {"bookmaker":"draftkings","odds":-110}
                ]},
                {"player":"Juan Soto","type":"walks"}
            ]"#,
        )
        .unwrap();
        assert_eq!(markets.len(), 2);
        assert_eq!(markets[0].books.len(), 2);
        assert!(markets[1].books.is_empty());
        assert_eq!(stats.markets, 2);
        assert_eq!(stats.quotes, 2);
    }

    #[test]
    fn snapshot_skips_bad_records_and_keeps_the_rest() {
        let (markets, stats) = parse_snapshot(
            r#"[
                {"player":"Aaron Judge","type":"hits","books":[
                    {"bookmaker":"fanduel","odds":250},
                    {"bookmaker":"draftkings","odds":-110}
                ]},
                {"player":"Juan Soto","type":"hits","books":[
                    {"bookmaker":"fanduel","odds":1.91},
                    {"bookmaker":"betmgm","odds":0},
                    {"odds":120},
                    {"bookmaker":"caesars","odds":"+105"},
                    {"bookmaker":"draftkings","odds":-120}
                ]},
                {"player":"Rafael Devers","books":[]},
                {"player":"  ","type":"hits","books":[]},
                42
            ]"#,
        )
        .unwrap();

        let judge: Vec<(&str, i32)> =
            markets[0].books.iter().map(|b| (b.bookmaker.as_str(), b.odds)).collect();
        assert_eq!(markets[0].player, "Aaron Judge");
        assert_eq!(judge, vec![("fanduel", 250), ("draftkings", -110)]);

        assert_eq!(markets.len(), 2);
        assert_eq!(markets[1].player, "Juan Soto");
        assert_eq!(markets[1].books, vec![BookQuote { bookmaker: "draftkings".to_string(), odds: -120 }]);

        assert_eq!(stats.outcomes_total, 7);
        assert_eq!(stats.rejected_bad_price, 2);
        assert_eq!(stats.rejected_malformed, 4);
        assert_eq!(stats.rejected_no_player, 1);
        assert_eq!(stats.quotes, 3);
        assert_eq!(stats.markets, 2);
    }

    #[test]
    fn snapshot_rejects_malformed_json() {
        assert!(matches!(parse_snapshot("{not json"), Err(AppError::Json(_))));
    }

    #[test]
    fn snapshot_must_be_an_array() {
        let err = parse_snapshot(r#"{"player":"Aaron Judge","type":"hits"}"#).unwrap_err();
        assert!(matches!(err, AppError::Json(_)));
    }

    #[tokio::test]
    async fn load_snapshot_reads_file() {
        let path = std::env::temp_dir().join(format!("snapshot-{}.json", std::process::id()));
        tokio::fs::write(&path, r#"[{"player":"Aaron Judge","type":"hits","books":[]}]"#)
            .await
            .unwrap();
        let (markets, stats) = load_snapshot(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(markets[0].player, "Aaron Judge");
        assert_eq!(stats.markets, 1);
    }

    #[tokio::test]
    async fn load_snapshot_missing_file_is_io_error() {
        let err = load_snapshot("/nonexistent/markets.json").await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
