//! Batch refresh of per-symbol candle history with bounded per-symbol retry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::Result;
use crate::market::binance::{CandleSource, FetchWindow};
use crate::market::candle::{Candle, RefreshResult, CANDLE_LIMIT};

/// Per-symbol retry policy. The defaults reproduce the deployed behavior;
/// both values are plain configuration, not load-bearing constants.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(30),
        }
    }
}

/// Re-fetches candle history for a set of symbols. All symbols are fetched
/// concurrently; each fetch retries on its own up to the policy bound, and a
/// symbol that exhausts its attempts is dropped from the result instead of
/// failing the batch.
pub struct Refresher<S: CandleSource> {
    source: Arc<S>,
    policy: RetryPolicy,
    // Generation counter per scope, so refreshes for independent display
    // states (different user or list type) never supersede each other.
    generations: Mutex<HashMap<String, u64>>,
}

impl<S: CandleSource + 'static> Refresher<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self {
            source: Arc::new(source),
            policy,
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// One refresh batch for one scope (one display state, e.g. a user's
    /// list). Returns `Ok(None)` when a newer refresh for the same scope was
    /// started while this one was in flight; the stale result must not be
    /// applied to display state.
    pub async fn refresh(&self, scope: &str, symbols: &[String]) -> Result<Option<RefreshResult>> {
        let generation = {
            let mut generations = self.generations.lock().await;
            let counter = generations.entry(scope.to_string()).or_insert(0);
            *counter += 1;
            *counter
        };
        let window = FetchWindow::current(Utc::now());

        let mut tasks = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let source = Arc::clone(&self.source);
            let policy = self.policy.clone();
            let symbol = symbol.clone();
            tasks.push(tokio::spawn(async move {
                let candles = fetch_with_retry(source.as_ref(), &symbol, window, &policy).await;
                (symbol, candles)
            }));
        }

        let mut klines = HashMap::new();
        for joined in join_all(tasks).await {
            match joined {
                Ok((symbol, Some(candles))) => {
                    klines.insert(symbol, candles);
                }
                Ok((_, None)) => {}
                Err(e) => warn!(error = %e, "Kline fetch task failed to join"),
            }
        }

        let latest = {
            let generations = self.generations.lock().await;
            generations.get(scope).copied().unwrap_or(0)
        };
        if latest != generation {
            info!(scope, generation, "Refresh superseded by a newer request, discarding result");
            return Ok(None);
        }

        info!(
            scope,
            requested = symbols.len(),
            fetched = klines.len(),
            "Refresh batch complete"
        );
        Ok(Some(RefreshResult {
            klines,
            last_updated: Utc::now(),
        }))
    }
}

/// Bounded retry loop for one symbol. `None` means the retry budget is spent;
/// the failure stays contained here and never reaches the batch.
async fn fetch_with_retry<S: CandleSource + ?Sized>(
    source: &S,
    symbol: &str,
    window: FetchWindow,
    policy: &RetryPolicy,
) -> Option<Vec<Candle>> {
    for attempt in 1..=policy.max_attempts {
        match source.daily_klines(symbol, window).await {
            Ok(mut candles) => {
                // The window over-fetches by one day; keep the most recent 30.
                if candles.len() > CANDLE_LIMIT {
                    let excess = candles.len() - CANDLE_LIMIT;
                    candles.drain(..excess);
                }
                return Some(candles);
            }
            Err(e) if attempt < policy.max_attempts => {
                warn!(
                    symbol,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Kline fetch failed, retrying after delay"
                );
                sleep(policy.delay).await;
            }
            Err(e) => {
                warn!(symbol, error = %e, "Kline fetch exhausted its retry budget");
            }
        }
    }
    None
}
