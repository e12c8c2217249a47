//! Ticker Pulse - crypto price band watcher
//! Tracks rolling min/max bands per asset and notifies a chat channel on breaches

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

// Re-export main types for convenience
pub use application::{BotSettings, PulseBot, TrackedAssets, WorkerPool};
pub use config::Config;
pub use infrastructure::notifier::{Notifier, TelegramNotifier};
pub use infrastructure::price_feed::{CoinGeckoClient, PriceFeed};
