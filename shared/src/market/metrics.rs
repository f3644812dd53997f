//! Market-wide metrics from public aggregator APIs.
//!
//! Responses are parsed into explicit structs at the boundary; a shape
//! mismatch is an [`Error::Format`], never loosely-typed data passed inward.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

const FEAR_GREED_URL: &str = "https://api.alternative.me/fng/";
const COINGECKO_GLOBAL_URL: &str = "https://api.coingecko.com/api/v3/global";
const DEFILLAMA_PROTOCOLS_URL: &str = "https://api.llama.fi/protocols";
const DEFILLAMA_CHAINS_URL: &str = "https://api.llama.fi/v2/chains";
const DEFILLAMA_STABLECOINS_URL: &str = "https://stablecoins.llama.fi/stablecoins?includePrices=true";
const DEFILLAMA_YIELDS_URL: &str = "https://yields.llama.fi/pools";
const DEFILLAMA_DEX_VOLUMES_URL: &str = "https://api.llama.fi/overview/dexs";
const DEFILLAMA_FEES_URL: &str = "https://api.llama.fi/overview/fees";

const TOP_PROTOCOLS: usize = 20;
const DEFAULT_CATEGORY: &str = "Uncategorized";

#[derive(Debug, Deserialize)]
struct FngResponse {
    data: Vec<FngEntry>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    value: String,
    value_classification: String,
}

#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    market_cap_percentage: HashMap<String, f64>,
    total_market_cap: HashMap<String, f64>,
    total_volume: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct ProtocolEntry {
    name: String,
    #[serde(default)]
    tvl: Option<f64>,
    #[serde(default)]
    change_1d: Option<f64>,
    #[serde(default)]
    change_7d: Option<f64>,
    #[serde(default)]
    category: String,
}

#[derive(Debug, Deserialize)]
struct ChainEntry {
    name: String,
    #[serde(default)]
    tvl: Option<f64>,
    #[serde(rename = "tokenSymbol", default)]
    token_symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StablecoinsResponse {
    #[serde(rename = "peggedAssets")]
    pegged_assets: Vec<PeggedAsset>,
    #[serde(default)]
    chains: Vec<PeggedChain>,
}

#[derive(Debug, Deserialize)]
struct PeggedAsset {
    name: String,
    symbol: String,
    circulating: PeggedUsd,
    #[serde(rename = "circulatingPrevDay", default)]
    circulating_prev_day: PeggedUsd,
    #[serde(rename = "circulatingPrevWeek", default)]
    circulating_prev_week: PeggedUsd,
    #[serde(rename = "circulatingPrevMonth", default)]
    circulating_prev_month: PeggedUsd,
}

#[derive(Debug, Deserialize)]
struct PeggedChain {
    name: String,
    #[serde(rename = "totalCirculatingUSD", default)]
    total_circulating_usd: PeggedUsd,
}

/// Circulating supply bucketed by peg currency; only the USD peg is used.
#[derive(Debug, Default, Deserialize)]
struct PeggedUsd {
    #[serde(rename = "peggedUSD", default)]
    pegged_usd: f64,
}

#[derive(Debug, Deserialize)]
struct YieldsResponse {
    data: Vec<PoolEntry>,
}

#[derive(Debug, Deserialize)]
struct PoolEntry {
    symbol: String,
    chain: String,
    project: String,
    #[serde(default)]
    apy: Option<f64>,
    #[serde(rename = "tvlUsd", default)]
    tvl_usd: Option<f64>,
}

/// Shared shape of the dexs and fees overview endpoints.
#[derive(Debug, Deserialize)]
struct OverviewResponse {
    protocols: Vec<OverviewEntry>,
}

#[derive(Debug, Deserialize)]
struct OverviewEntry {
    name: String,
    #[serde(rename = "total24h", default)]
    total_24h: Option<f64>,
    #[serde(rename = "total7d", default)]
    total_7d: Option<f64>,
    #[serde(rename = "total30d", default)]
    total_30d: Option<f64>,
    #[serde(default)]
    change_1d: Option<f64>,
    #[serde(default)]
    change_7d: Option<f64>,
    #[serde(default)]
    change_1m: Option<f64>,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FearGreedIndex {
    pub value: i32,
    pub classification: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketDominance {
    pub btc: f64,
    pub stablecoins: f64,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalMetrics {
    pub total_market_cap: String,
    pub total_24h_volume: String,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProtocolTvl {
    pub name: String,
    pub tvl: String,
    pub change_1d: String,
    pub change_7d: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainTvl {
    pub name: String,
    pub tvl: String,
    pub token_symbol: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StablecoinSupply {
    pub name: String,
    pub symbol: String,
    pub circulating: String,
    pub change_1d: String,
    pub change_7d: String,
    pub change_30d: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainStablecoins {
    pub name: String,
    pub total_circulating: String,
}

/// Top stablecoins by circulating USD supply plus the per-chain totals,
/// both taken from the same aggregator response.
#[derive(Debug, Clone, Serialize)]
pub struct StablecoinsOverview {
    pub stablecoins: Vec<StablecoinSupply>,
    pub chain_stables: Vec<ChainStablecoins>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolYield {
    pub name: String,
    pub chain: String,
    pub apy: String,
    pub tvl: String,
    pub project: String,
}

/// One row of a dexs/fees overview: 24h/7d/30d totals with their changes.
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolActivity {
    pub name: String,
    pub volume_24h: String,
    pub volume_7d: String,
    pub volume_30d: String,
    pub change_1d: String,
    pub change_7d: String,
    pub change_30d: String,
    pub category: String,
}

#[derive(Clone, Default)]
pub struct MetricsClient {
    http: reqwest::Client,
}

impl MetricsClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    pub async fn fear_greed_index(&self) -> Result<FearGreedIndex> {
        debug!("Fetching fear & greed index");
        let response = self.http.get(FEAR_GREED_URL).send().await?.error_for_status()?;
        let body: FngResponse = response
            .json()
            .await
            .map_err(|e| Error::Format(format!("unexpected fear & greed payload: {}", e)))?;
        let entry = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::Format("fear & greed response has no data".to_string()))?;
        let value = entry
            .value
            .parse::<i32>()
            .map_err(|_| Error::Format(format!("fear & greed value is not numeric: {}", entry.value)))?;
        Ok(FearGreedIndex {
            value,
            classification: entry.value_classification,
            timestamp: Utc::now(),
        })
    }

    pub async fn market_dominance(&self) -> Result<MarketDominance> {
        let data = self.global_data().await?;
        let btc = *data
            .market_cap_percentage
            .get("btc")
            .ok_or_else(|| Error::Format("global data missing btc dominance".to_string()))?;
        let stablecoins = data.market_cap_percentage.get("usdt").copied().unwrap_or(0.0)
            + data.market_cap_percentage.get("usdc").copied().unwrap_or(0.0);
        Ok(MarketDominance {
            btc,
            stablecoins,
            last_update: Utc::now(),
        })
    }

    pub async fn global_metrics(&self) -> Result<GlobalMetrics> {
        let data = self.global_data().await?;
        let market_cap = *data
            .total_market_cap
            .get("usd")
            .ok_or_else(|| Error::Format("global data missing usd market cap".to_string()))?;
        let volume = *data
            .total_volume
            .get("usd")
            .ok_or_else(|| Error::Format("global data missing usd volume".to_string()))?;
        Ok(GlobalMetrics {
            total_market_cap: format_number(market_cap),
            total_24h_volume: format_number(volume),
            last_update: Utc::now(),
        })
    }

    /// Top protocols by TVL, centralized exchanges excluded.
    pub async fn protocol_tvl(&self) -> Result<Vec<ProtocolTvl>> {
        debug!("Fetching protocol TVL");
        let response = self
            .http
            .get(DEFILLAMA_PROTOCOLS_URL)
            .send()
            .await?
            .error_for_status()?;
        let mut protocols: Vec<ProtocolEntry> = response
            .json()
            .await
            .map_err(|e| Error::Format(format!("unexpected protocols payload: {}", e)))?;

        protocols.retain(|p| p.category != "CEX");
        protocols.sort_by(|a, b| {
            b.tvl
                .unwrap_or(0.0)
                .total_cmp(&a.tvl.unwrap_or(0.0))
        });
        Ok(protocols
            .into_iter()
            .take(TOP_PROTOCOLS)
            .map(|p| ProtocolTvl {
                name: p.name,
                tvl: format_number(p.tvl.unwrap_or(0.0)),
                change_1d: format_change(p.change_1d),
                change_7d: format_change(p.change_7d),
                category: p.category,
            })
            .collect())
    }

    /// Top chains by TVL.
    pub async fn chains_tvl(&self) -> Result<Vec<ChainTvl>> {
        debug!("Fetching chain TVL");
        let response = self
            .http
            .get(DEFILLAMA_CHAINS_URL)
            .send()
            .await?
            .error_for_status()?;
        let mut chains: Vec<ChainEntry> = response
            .json()
            .await
            .map_err(|e| Error::Format(format!("unexpected chains payload: {}", e)))?;

        chains.sort_by(|a, b| b.tvl.unwrap_or(0.0).total_cmp(&a.tvl.unwrap_or(0.0)));
        Ok(chains
            .into_iter()
            .take(TOP_PROTOCOLS)
            .map(|c| ChainTvl {
                name: c.name,
                tvl: format_number(c.tvl.unwrap_or(0.0)),
                token_symbol: c.token_symbol.unwrap_or_default(),
            })
            .collect())
    }

    /// Top stablecoins by circulating USD supply, with supply change over
    /// one day, one week and one month, plus per-chain totals.
    pub async fn stablecoins_supply(&self) -> Result<StablecoinsOverview> {
        debug!("Fetching stablecoin supply");
        let response = self
            .http
            .get(DEFILLAMA_STABLECOINS_URL)
            .send()
            .await?
            .error_for_status()?;
        let body: StablecoinsResponse = response
            .json()
            .await
            .map_err(|e| Error::Format(format!("unexpected stablecoins payload: {}", e)))?;

        let mut assets = body.pegged_assets;
        assets.sort_by(|a, b| b.circulating.pegged_usd.total_cmp(&a.circulating.pegged_usd));
        let stablecoins = assets
            .into_iter()
            .take(TOP_PROTOCOLS)
            .map(|coin| {
                let current = coin.circulating.pegged_usd;
                StablecoinSupply {
                    name: coin.name,
                    symbol: coin.symbol,
                    circulating: format_number(current),
                    change_1d: pct_change(current, coin.circulating_prev_day.pegged_usd),
                    change_7d: pct_change(current, coin.circulating_prev_week.pegged_usd),
                    change_30d: pct_change(current, coin.circulating_prev_month.pegged_usd),
                }
            })
            .collect();

        let mut chains = body.chains;
        chains.sort_by(|a, b| {
            b.total_circulating_usd
                .pegged_usd
                .total_cmp(&a.total_circulating_usd.pegged_usd)
        });
        let chain_stables = chains
            .into_iter()
            .take(TOP_PROTOCOLS)
            .map(|chain| ChainStablecoins {
                name: chain.name,
                total_circulating: format_number(chain.total_circulating_usd.pegged_usd),
            })
            .collect();

        Ok(StablecoinsOverview {
            stablecoins,
            chain_stables,
        })
    }

    /// Top yield pools by TVL.
    pub async fn pool_yields(&self) -> Result<Vec<PoolYield>> {
        debug!("Fetching pool yields");
        let response = self
            .http
            .get(DEFILLAMA_YIELDS_URL)
            .send()
            .await?
            .error_for_status()?;
        let body: YieldsResponse = response
            .json()
            .await
            .map_err(|e| Error::Format(format!("unexpected yields payload: {}", e)))?;

        let mut pools = body.data;
        pools.sort_by(|a, b| b.tvl_usd.unwrap_or(0.0).total_cmp(&a.tvl_usd.unwrap_or(0.0)));
        Ok(pools
            .into_iter()
            .take(TOP_PROTOCOLS)
            .map(|pool| PoolYield {
                name: pool.symbol,
                chain: pool.chain,
                apy: format_apy(pool.apy),
                tvl: format_number(pool.tvl_usd.unwrap_or(0.0)),
                project: pool.project,
            })
            .collect())
    }

    /// Top DEXs by 24h trading volume.
    pub async fn dex_volumes(&self) -> Result<Vec<ProtocolActivity>> {
        self.overview(DEFILLAMA_DEX_VOLUMES_URL).await
    }

    /// Top protocols by 24h fees.
    pub async fn protocol_fees(&self) -> Result<Vec<ProtocolActivity>> {
        self.overview(DEFILLAMA_FEES_URL).await
    }

    async fn overview(&self, url: &str) -> Result<Vec<ProtocolActivity>> {
        debug!(url, "Fetching protocol overview");
        let response = self.http.get(url).send().await?.error_for_status()?;
        let body: OverviewResponse = response
            .json()
            .await
            .map_err(|e| Error::Format(format!("unexpected overview payload: {}", e)))?;

        let mut protocols = body.protocols;
        protocols.sort_by(|a, b| b.total_24h.unwrap_or(0.0).total_cmp(&a.total_24h.unwrap_or(0.0)));
        Ok(protocols
            .into_iter()
            .take(TOP_PROTOCOLS)
            .map(|p| ProtocolActivity {
                name: p.name,
                volume_24h: format_number(p.total_24h.unwrap_or(0.0)),
                volume_7d: format_number(p.total_7d.unwrap_or(0.0)),
                volume_30d: format_number(p.total_30d.unwrap_or(0.0)),
                change_1d: format_change(p.change_1d),
                change_7d: format_change(p.change_7d),
                change_30d: format_change(p.change_1m),
                category: p
                    .category
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            })
            .collect())
    }

    async fn global_data(&self) -> Result<GlobalData> {
        debug!("Fetching global market data");
        let response = self
            .http
            .get(COINGECKO_GLOBAL_URL)
            .send()
            .await?
            .error_for_status()?;
        let body: GlobalResponse = response
            .json()
            .await
            .map_err(|e| Error::Format(format!("unexpected global payload: {}", e)))?;
        Ok(body.data)
    }
}

fn format_number(value: f64) -> String {
    if value >= 1_000_000_000.0 {
        format!("{:.2}B", value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("{:.2}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.2}K", value / 1_000.0)
    } else {
        format!("{:.2}", value)
    }
}

fn format_change(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "0".to_string())
}

fn format_apy(value: Option<f64>) -> String {
    format!("{:.2}%", value.unwrap_or(0.0))
}

/// Percentage change of `current` against a previous supply snapshot. A
/// missing or zero snapshot renders as "0" instead of dividing by it.
fn pct_change(current: f64, previous: f64) -> String {
    if previous <= 0.0 {
        return "0".to_string();
    }
    format!("{:.2}", (current - previous) / previous * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_magnitude_suffixes() {
        assert_eq!(format_number(2_450_000_000_000.0), "2450.00B");
        assert_eq!(format_number(1_234_567_890.0), "1.23B");
        assert_eq!(format_number(56_700_000.0), "56.70M");
        assert_eq!(format_number(12_345.0), "12.35K");
        assert_eq!(format_number(999.994), "999.99");
    }

    #[test]
    fn missing_change_renders_as_zero() {
        assert_eq!(format_change(None), "0");
        assert_eq!(format_change(Some(-3.456)), "-3.46");
    }

    #[test]
    fn supply_change_is_a_percentage_of_the_snapshot() {
        assert_eq!(pct_change(110.0, 100.0), "10.00");
        assert_eq!(pct_change(95.0, 100.0), "-5.00");
        assert_eq!(pct_change(1.0, 0.0), "0");
    }

    #[test]
    fn missing_apy_renders_as_zero_percent() {
        assert_eq!(format_apy(Some(12.345)), "12.35%");
        assert_eq!(format_apy(None), "0.00%");
    }

    #[test]
    fn stablecoin_response_reads_pegged_usd_buckets() {
        let body = serde_json::json!({
            "peggedAssets": [{
                "name": "Tether",
                "symbol": "USDT",
                "circulating": { "peggedUSD": 110_000_000_000.0 },
                "circulatingPrevDay": { "peggedUSD": 100_000_000_000.0 },
                "circulatingPrevWeek": { "peggedUSD": 100_000_000_000.0 },
                "circulatingPrevMonth": { "peggedUSD": 100_000_000_000.0 }
            }],
            "chains": [{
                "name": "Ethereum",
                "totalCirculatingUSD": { "peggedUSD": 80_000_000_000.0 }
            }]
        });
        let parsed: StablecoinsResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.pegged_assets[0].symbol, "USDT");
        assert_eq!(parsed.pegged_assets[0].circulating.pegged_usd, 110_000_000_000.0);
        assert_eq!(parsed.chains[0].total_circulating_usd.pegged_usd, 80_000_000_000.0);
    }

    #[test]
    fn overview_entry_reads_totals_and_monthly_change() {
        let body = serde_json::json!({
            "protocols": [{
                "name": "Uniswap",
                "total24h": 1_200_000_000.0,
                "total7d": 8_000_000_000.0,
                "total30d": 30_000_000_000.0,
                "change_1d": 2.5,
                "change_7d": -1.25,
                "change_1m": 10.0,
                "category": "Dexs"
            }]
        });
        let parsed: OverviewResponse = serde_json::from_value(body).unwrap();
        let entry = &parsed.protocols[0];
        assert_eq!(entry.total_24h, Some(1_200_000_000.0));
        assert_eq!(entry.change_1m, Some(10.0));
        assert_eq!(entry.category.as_deref(), Some("Dexs"));
    }
}
