//! Common types used across the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference currency used for every price request
pub const DEFAULT_CURRENCY: &str = "usd";

/// Observed (min, max) price range over a lookback window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    /// Returns `None` when the bounds are inverted or not finite.
    pub fn new(min: f64, max: f64) -> Option<Self> {
        if min.is_finite() && max.is_finite() && min <= max {
            Some(Self { min, max })
        } else {
            None
        }
    }
}

/// Static description of an asset, as listed in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Identifier used to query the price feed (e.g. `bitcoin`)
    pub id: String,
    /// Ticker (e.g. `BTC`)
    pub symbol: String,
    /// Human readable label (e.g. `Bitcoin`)
    pub name: String,
}

impl AssetInfo {
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

/// One monitored asset together with its last computed band.
///
/// Records are never edited in place once published; a refresh produces a
/// new record via [`TrackedAsset::with_band`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedAsset {
    pub info: AssetInfo,
    /// `None` until the first successful band refresh
    pub band: Option<Band>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TrackedAsset {
    pub fn new(info: AssetInfo) -> Self {
        Self {
            info,
            band: None,
            updated_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn symbol(&self) -> &str {
        &self.info.symbol
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Replacement record carrying a freshly computed band
    pub fn with_band(&self, band: Band, updated_at: DateTime<Utc>) -> Self {
        Self {
            info: self.info.clone(),
            band: Some(band),
            updated_at: Some(updated_at),
        }
    }
}

/// Built-in catalog used when the configuration lists no assets
pub fn default_catalog() -> Vec<AssetInfo> {
    vec![
        AssetInfo::new("bitcoin", "BTC", "Bitcoin"),
        AssetInfo::new("ethereum", "ETH", "Ethereum"),
        AssetInfo::new("tether", "USDT", "Tether"),
        AssetInfo::new("binancecoin", "BNB", "Binance Coin"),
        AssetInfo::new("usd-coin", "USDC", "USD Coin"),
        AssetInfo::new("ripple", "XRP", "Ripple"),
        AssetInfo::new("cardano", "ADA", "Cardano"),
        AssetInfo::new("dogecoin", "DOGE", "Dogecoin"),
        AssetInfo::new("solana", "SOL", "Solana"),
        AssetInfo::new("the-open-network", "TON", "The Open Network"),
    ]
}
