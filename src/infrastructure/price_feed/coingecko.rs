use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::PriceFeed;
use crate::config::FeedCfg;
use crate::domain::price::{PriceSeries, PriceSnapshot};
use crate::shared::errors::FeedError;

const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// `/coins/{id}/market_chart` response; only the price rows are used
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<Vec<f64>>,
}

/// CoinGecko REST client
pub struct CoinGeckoClient {
    http_client: Client,
    base_url: String,
    currency: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(cfg: &FeedCfg) -> Result<Self, FeedError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|e| FeedError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            currency: cfg.currency.clone(),
            api_key: cfg.api_key.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FeedError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let mut request = self.http_client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("CoinGecko request {} failed with status {}", path, status);
            return Err(FeedError::Transport(format!("{} returned {}", path, status)));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FeedError::Decode(format!("{}: {}", path, e)))
    }
}

/// Turn a `/simple/price` body into a snapshot.
///
/// Entries without a numeric price in `currency` are kept as malformed so the
/// caller can report them per asset.
pub fn parse_snapshot(
    raw: HashMap<String, HashMap<String, serde_json::Value>>,
    currency: &str,
) -> PriceSnapshot {
    let mut snapshot = PriceSnapshot::new(currency);
    for (id, quotes) in raw {
        let price = quotes.get(currency).and_then(serde_json::Value::as_f64);
        snapshot.insert(id, price);
    }
    snapshot
}

#[async_trait]
impl PriceFeed for CoinGeckoClient {
    async fn fetch_snapshot(&self, ids: &[String], currency: &str) -> Result<PriceSnapshot, FeedError> {
        let raw: HashMap<String, HashMap<String, serde_json::Value>> = self
            .get_json(
                "/simple/price",
                &[
                    ("ids", ids.join(",")),
                    ("vs_currencies", currency.to_string()),
                ],
            )
            .await?;

        Ok(parse_snapshot(raw, currency))
    }

    async fn fetch_historical_series(&self, id: &str, lookback_days: u32) -> Result<PriceSeries, FeedError> {
        let chart: MarketChartResponse = self
            .get_json(
                &format!("/coins/{}/market_chart", id),
                &[
                    ("vs_currency", self.currency.clone()),
                    ("days", lookback_days.to_string()),
                    ("interval", "daily".to_string()),
                ],
            )
            .await?;

        Ok(PriceSeries::from_rows(chart.prices))
    }
}
