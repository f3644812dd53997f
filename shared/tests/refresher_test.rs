//! Refresher behavior against a scripted candle source.
//!
//! Tests run with a paused tokio clock so the fixed retry delay costs no
//! wall time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use shared::error::{Error, Result};
use shared::market::{Candle, CandleSource, FetchWindow, Refresher, RetryPolicy};

/// Scripted outcomes per symbol: one entry per attempt, the last entry
/// repeating once the script runs out.
enum Outcome {
    Fail,
    Succeed(usize),
}

type AttemptLog = Arc<Mutex<HashMap<String, u32>>>;

struct ScriptedSource {
    scripts: HashMap<String, Vec<Outcome>>,
    attempts: AttemptLog,
}

impl ScriptedSource {
    fn new(scripts: Vec<(&str, Vec<Outcome>)>) -> (Self, AttemptLog) {
        let attempts: AttemptLog = Arc::new(Mutex::new(HashMap::new()));
        let source = Self {
            scripts: scripts
                .into_iter()
                .map(|(symbol, outcomes)| (symbol.to_string(), outcomes))
                .collect(),
            attempts: Arc::clone(&attempts),
        };
        (source, attempts)
    }
}

fn attempts_for(log: &AttemptLog, symbol: &str) -> u32 {
    log.lock().unwrap().get(symbol).copied().unwrap_or(0)
}

#[async_trait]
impl CandleSource for ScriptedSource {
    async fn daily_klines(&self, symbol: &str, _window: FetchWindow) -> Result<Vec<Candle>> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let counter = attempts.entry(symbol.to_string()).or_insert(0);
            *counter += 1;
            *counter as usize - 1
        };
        let script = self
            .scripts
            .get(symbol)
            .unwrap_or_else(|| panic!("no script for {symbol}"));
        let outcome = script.get(attempt).unwrap_or_else(|| script.last().unwrap());
        match outcome {
            Outcome::Fail => Err(Error::Format(format!("scripted failure for {symbol}"))),
            Outcome::Succeed(n) => Ok(make_candles(*n)),
        }
    }
}

fn make_candles(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| Candle {
            time: format!("2024-05-{:02}", i + 1),
            open: 100.0 + i as f64,
            high: 110.0 + i as f64,
            low: 90.0 + i as f64,
            close: 105.0 + i as f64,
            volume: 1_000.0 + i as f64,
        })
        .collect()
}

fn policy() -> RetryPolicy {
    RetryPolicy::default()
}

fn symbols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn exhausted_symbol_is_absent_and_others_survive() {
    let (source, _) = ScriptedSource::new(vec![
        ("BTC", vec![Outcome::Succeed(30)]),
        ("ETH", vec![Outcome::Fail]),
    ]);
    let refresher = Refresher::new(source, policy());

    let result = refresher
        .refresh("u1:mainstream", &symbols(&["BTC", "ETH"]))
        .await
        .unwrap()
        .expect("latest refresh is applied");

    assert_eq!(result.klines.len(), 1);
    assert_eq!(result.klines["BTC"].len(), 30);
    assert!(!result.klines.contains_key("ETH"));
    assert!(result.last_updated <= Utc::now());
}

#[tokio::test(start_paused = true)]
async fn failing_symbol_uses_full_retry_budget() {
    let (source, attempts) = ScriptedSource::new(vec![("DOGE", vec![Outcome::Fail])]);
    let refresher = Refresher::new(source, policy());

    let result = refresher.refresh("u1:mainstream", &symbols(&["DOGE"])).await.unwrap().unwrap();

    assert!(result.klines.is_empty());
    assert_eq!(attempts_for(&attempts, "DOGE"), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_is_transparent_when_a_later_attempt_succeeds() {
    let (source, attempts) = ScriptedSource::new(vec![(
        "SOL",
        vec![Outcome::Fail, Outcome::Fail, Outcome::Succeed(5)],
    )]);
    let refresher = Refresher::new(source, policy());

    let result = refresher.refresh("u1:mainstream", &symbols(&["SOL"])).await.unwrap().unwrap();

    let candles = &result.klines["SOL"];
    assert_eq!(candles.len(), 5);
    assert_eq!(candles[0].open, 100.0);
    assert_eq!(candles[4].close, 109.0);
    assert_eq!(attempts_for(&attempts, "SOL"), 3);
}

#[tokio::test(start_paused = true)]
async fn over_fetched_history_is_truncated_to_most_recent_thirty() {
    let (source, _) = ScriptedSource::new(vec![("BTC", vec![Outcome::Succeed(31)])]);
    let refresher = Refresher::new(source, policy());

    let result = refresher.refresh("u1:mainstream", &symbols(&["BTC"])).await.unwrap().unwrap();

    let candles = &result.klines["BTC"];
    assert_eq!(candles.len(), 30);
    // The oldest candle was dropped, not the newest.
    assert_eq!(candles[0].time, "2024-05-02");
    assert_eq!(candles[29].time, "2024-05-31");
}

#[tokio::test(start_paused = true)]
async fn respects_configured_attempt_bound() {
    let (source, attempts) = ScriptedSource::new(vec![("ADA", vec![Outcome::Fail])]);
    let refresher = Refresher::new(
        source,
        RetryPolicy {
            max_attempts: 1,
            delay: std::time::Duration::from_secs(30),
        },
    );

    let result = refresher.refresh("u1:mainstream", &symbols(&["ADA"])).await.unwrap().unwrap();

    assert!(result.klines.is_empty());
    assert_eq!(attempts_for(&attempts, "ADA"), 1);
}

#[tokio::test(start_paused = true)]
async fn superseded_refresh_is_discarded() {
    let (source, _) = ScriptedSource::new(vec![
        ("BTC", vec![Outcome::Fail, Outcome::Succeed(30)]),
        ("ETH", vec![Outcome::Succeed(30)]),
    ]);
    let refresher = Refresher::new(source, policy());

    // First refresh parks on its retry delay after the initial failure.
    let slow_symbols = symbols(&["BTC"]);
    let slow = refresher.refresh("u1:mainstream", &slow_symbols);
    tokio::pin!(slow);
    assert!(futures::poll!(slow.as_mut()).is_pending());

    // A second refresh started meanwhile becomes the latest generation.
    let fresh = refresher.refresh("u1:mainstream", &symbols(&["ETH"])).await.unwrap();
    assert!(fresh.is_some());

    // The superseded refresh completes but its result must be discarded.
    let stale = slow.await.unwrap();
    assert!(stale.is_none());
}

#[tokio::test(start_paused = true)]
async fn refreshes_in_different_scopes_do_not_supersede_each_other() {
    let (source, _) = ScriptedSource::new(vec![
        ("BTC", vec![Outcome::Fail, Outcome::Succeed(30)]),
        ("ETH", vec![Outcome::Succeed(30)]),
    ]);
    let refresher = Refresher::new(source, policy());

    // A refresh for one user's list parks on its retry delay.
    let mainstream_symbols = symbols(&["BTC"]);
    let mainstream = refresher.refresh("u1:mainstream", &mainstream_symbols);
    tokio::pin!(mainstream);
    assert!(futures::poll!(mainstream.as_mut()).is_pending());

    // Another scope refreshing meanwhile must not bump this one's generation.
    let meme = refresher.refresh("u1:meme", &symbols(&["ETH"])).await.unwrap();
    assert!(meme.is_some());

    let result = mainstream.await.unwrap().expect("still the latest for its scope");
    assert_eq!(result.klines["BTC"].len(), 30);
}
