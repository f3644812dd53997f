//! Daily kline client for the exchange REST endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use chrono_tz::Asia::Shanghai;
use chrono_tz::Tz;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::market::candle::{Candle, CANDLE_LIMIT};

/// Reference zone for the fetch window and date labels. Computing the window
/// end as "start of tomorrow" here keeps the most recent completed candle in
/// range regardless of clock skew against the exchange.
const REFERENCE_ZONE: Tz = Shanghai;

const QUOTE_CURRENCY: &str = "USDT";
const KLINES_PATH: &str = "/api/v3/klines";
const DATE_LABEL_FORMAT: &str = "%Y-%m-%d";

/// Epoch-millisecond bounds for one kline request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl FetchWindow {
    /// Window ending at the start of "tomorrow" in the reference zone and
    /// starting 31 calendar days earlier. The extra day over the 30-candle
    /// target absorbs day-boundary effects; the refresher truncates.
    pub fn current(now: DateTime<Utc>) -> Self {
        let tomorrow = now.with_timezone(&REFERENCE_ZONE).date_naive() + Days::new(1);
        let end_ms = REFERENCE_ZONE
            .from_local_datetime(&tomorrow.and_time(NaiveTime::MIN))
            .earliest()
            .map(|dt| dt.timestamp_millis())
            .unwrap_or_else(|| now.timestamp_millis());
        Self {
            start_ms: end_ms - 31 * 24 * 60 * 60 * 1000,
            end_ms,
        }
    }
}

/// Source of daily candle history for one symbol. The refresher depends on
/// this seam so retry behavior is testable without a live exchange.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn daily_klines(&self, symbol: &str, window: FetchWindow) -> Result<Vec<Candle>>;
}

/// Kline client for Binance's public spot REST API.
#[derive(Debug, Clone)]
pub struct BinanceKlines {
    http: reqwest::Client,
    base_url: String,
}

impl BinanceKlines {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl CandleSource for BinanceKlines {
    async fn daily_klines(&self, symbol: &str, window: FetchWindow) -> Result<Vec<Candle>> {
        let url = klines_url(&self.base_url, symbol, window);
        debug!(%url, "Requesting daily klines");

        let response = self.http.get(&url).send().await?.error_for_status()?;
        let rows: Vec<Vec<Value>> = response
            .json()
            .await
            .map_err(|e| Error::Format(format!("unexpected kline payload: {}", e)))?;

        parse_kline_rows(&rows)
    }
}

fn klines_url(base_url: &str, symbol: &str, window: FetchWindow) -> String {
    format!(
        "{}{}?symbol={}{}&interval=1d&startTime={}&endTime={}&limit={}",
        base_url, KLINES_PATH, symbol, QUOTE_CURRENCY, window.start_ms, window.end_ms, CANDLE_LIMIT
    )
}

fn parse_kline_rows(rows: &[Vec<Value>]) -> Result<Vec<Candle>> {
    rows.iter().map(|row| parse_kline_row(row)).collect()
}

/// One kline row is a fixed-width array: index 0 is the open time in epoch
/// milliseconds, 1-4 are OHLC and 5 is volume, all encoded as strings.
fn parse_kline_row(row: &[Value]) -> Result<Candle> {
    let open_time = row
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::Format("kline row missing open time".to_string()))?;
    let time = DateTime::from_timestamp_millis(open_time)
        .ok_or_else(|| Error::Format(format!("kline open time out of range: {}", open_time)))?
        .with_timezone(&REFERENCE_ZONE)
        .format(DATE_LABEL_FORMAT)
        .to_string();

    Ok(Candle {
        time,
        open: field_f64(row, 1, "open")?,
        high: field_f64(row, 2, "high")?,
        low: field_f64(row, 3, "low")?,
        close: field_f64(row, 4, "close")?,
        volume: field_f64(row, 5, "volume")?,
    })
}

fn field_f64(row: &[Value], index: usize, name: &str) -> Result<f64> {
    row.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Format(format!("kline row missing {}", name)))?
        .parse::<f64>()
        .map_err(|_| Error::Format(format!("kline {} is not numeric", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn klines_url_includes_pair_interval_and_bounds() {
        let window = FetchWindow {
            start_ms: 1_000,
            end_ms: 2_000,
        };
        let url = klines_url("https://api.binance.com", "BTC", window);
        assert_eq!(
            url,
            "https://api.binance.com/api/v3/klines?symbol=BTCUSDT&interval=1d&startTime=1000&endTime=2000&limit=30"
        );
    }

    #[test]
    fn window_ends_at_start_of_tomorrow_in_reference_zone() {
        // 2024-05-01 10:00 UTC is 18:00 in Shanghai, so the window ends at
        // 2024-05-02 00:00 +08:00 = 2024-05-01 16:00 UTC.
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let window = FetchWindow::current(now);
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 16, 0, 0).unwrap();
        assert_eq!(window.end_ms, end.timestamp_millis());
        assert_eq!(window.end_ms - window.start_ms, 31 * 24 * 60 * 60 * 1000);
    }

    #[test]
    fn window_crosses_utc_date_boundary() {
        // 2024-05-01 20:00 UTC is already 2024-05-02 in Shanghai, so the
        // window ends at 2024-05-03 00:00 +08:00.
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap();
        let window = FetchWindow::current(now);
        let end = Utc.with_ymd_and_hms(2024, 5, 2, 16, 0, 0).unwrap();
        assert_eq!(window.end_ms, end.timestamp_millis());
    }

    #[test]
    fn parses_string_encoded_fields_to_floats() {
        let row = vec![
            json!(1_714_521_600_000_i64),
            json!("62000.1"),
            json!("63500.5"),
            json!("61000.0"),
            json!("62950.25"),
            json!("12345.678"),
        ];
        let candle = parse_kline_row(&row).unwrap();
        assert_eq!(candle.open, 62000.1);
        assert_eq!(candle.high, 63500.5);
        assert_eq!(candle.low, 61000.0);
        assert_eq!(candle.close, 62950.25);
        assert_eq!(candle.volume, 12345.678);
        assert_eq!(candle.time, "2024-05-01");
    }

    #[test]
    fn rejects_rows_with_missing_or_non_numeric_fields() {
        let short = vec![json!(1_714_521_600_000_i64), json!("1.0")];
        assert!(matches!(parse_kline_row(&short), Err(Error::Format(_))));

        let bad = vec![
            json!(1_714_521_600_000_i64),
            json!("not-a-number"),
            json!("2"),
            json!("3"),
            json!("4"),
            json!("5"),
        ];
        assert!(matches!(parse_kline_row(&bad), Err(Error::Format(_))));

        let no_time = vec![
            json!("oops"),
            json!("1"),
            json!("2"),
            json!("3"),
            json!("4"),
            json!("5"),
        ];
        assert!(matches!(parse_kline_row(&no_time), Err(Error::Format(_))));
    }
}
