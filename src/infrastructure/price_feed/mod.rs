pub mod coingecko;

pub use coingecko::CoinGeckoClient;

use async_trait::async_trait;
use crate::domain::price::{PriceSeries, PriceSnapshot};
use crate::shared::errors::FeedError;

/// Upstream source of current and historical prices.
///
/// Implementations do not retry; a failed call is reported to the caller as is.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Current price of every requested id, in `currency`
    async fn fetch_snapshot(&self, ids: &[String], currency: &str) -> Result<PriceSnapshot, FeedError>;

    /// Daily price series for one id over the last `lookback_days`
    async fn fetch_historical_series(&self, id: &str, lookback_days: u32) -> Result<PriceSeries, FeedError>;
}
