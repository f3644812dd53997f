//! Daily OHLCV candle data held in memory for one refresh cycle.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of completed daily candles kept per symbol.
pub const CANDLE_LIMIT: usize = 30;

/// One daily OHLCV record. Prices keep the exchange-native precision;
/// `time` is the display-formatted date label of the candle's open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Outcome of one refresh batch. Symbols whose fetch failed terminally are
/// simply absent from `klines`; candle data is never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResult {
    pub klines: HashMap<String, Vec<Candle>>,
    pub last_updated: DateTime<Utc>,
}
