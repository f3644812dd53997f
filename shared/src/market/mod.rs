pub mod binance;
pub mod candle;
pub mod metrics;
pub mod okx;
pub mod refresher;

pub use binance::{BinanceKlines, CandleSource, FetchWindow};
pub use candle::{Candle, RefreshResult, CANDLE_LIMIT};
pub use metrics::MetricsClient;
pub use okx::{OkxClient, TokenDetail};
pub use refresher::{Refresher, RetryPolicy};
