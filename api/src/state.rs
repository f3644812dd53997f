use std::sync::Arc;

use shared::market::{BinanceKlines, MetricsClient, OkxClient, Refresher, RetryPolicy};
use shared::{Config, SymbolRegistry, TokenRegistry};

#[derive(Clone)]
pub struct AppState {
    pub symbols: SymbolRegistry,
    pub tokens: TokenRegistry,
    pub refresher: Arc<Refresher<BinanceKlines>>,
    pub okx: OkxClient,
    pub metrics: MetricsClient,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let db = Arc::new(shared::connect(&config.database_url).await?);

        let policy = RetryPolicy {
            max_attempts: config.kline_retry_attempts,
            delay: config.kline_retry_delay,
        };
        let refresher = Arc::new(Refresher::new(
            BinanceKlines::new(config.binance_api_url.clone()),
            policy,
        ));

        Ok(AppState {
            symbols: SymbolRegistry::new(Arc::clone(&db)),
            tokens: TokenRegistry::new(db),
            refresher,
            okx: OkxClient::from_config(config),
            metrics: MetricsClient::new(),
        })
    }
}
