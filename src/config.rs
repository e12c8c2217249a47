use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use std::path::PathBuf;
use std::{fs, path::Path};

use crate::shared::errors::AppError;
use crate::shared::types::{default_catalog, AssetInfo, DEFAULT_CURRENCY};

/// Names the dotenv file read at startup
pub const ENV_FILE_VAR: &str = "ENV_FILE";
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Load `$ENV_FILE` (or `.env`) into the process environment.
///
/// Variables already set in the environment win. A missing file is not an error.
pub fn load_env_file() -> Result<Option<PathBuf>, AppError> {
    let path = std::env::var(ENV_FILE_VAR).unwrap_or_else(|_| DEFAULT_ENV_FILE.to_string());
    load_env_file_from(&path)
}

pub fn load_env_file_from(path: &str) -> Result<Option<PathBuf>, AppError> {
    match dotenvy::from_filename(path) {
        Ok(loaded) => Ok(Some(loaded)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(AppError::Config(format!("failed to load env file {}: {}", path, e))),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolCfg {
    pub workers: usize,
}

impl Default for PoolCfg {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramCfg {
    pub token: String,
    pub chat_id: String,
    pub api_url: String,
    pub poll_timeout_secs: u64,
}

impl Default for TelegramCfg {
    fn default() -> Self {
        Self {
            token: String::new(),
            chat_id: String::new(),
            api_url: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedCfg {
    pub base_url: String,
    pub currency: String,
    pub api_key: Option<String>,
    pub lookback_days: u32,
    /// Pause between per-asset history requests (upstream rate limit)
    pub request_pause_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for FeedCfg {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            api_key: None,
            lookback_days: 14,
            request_pause_secs: 15,
            request_timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingCfg {
    pub check_interval_secs: u64,
}

impl Default for PollingCfg {
    fn default() -> Self {
        Self {
            check_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pool: PoolCfg,
    pub telegram: TelegramCfg,
    pub feed: FeedCfg,
    pub polling: PollingCfg,
    pub assets: Vec<AssetInfo>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("parse Config.toml")?;
        Ok(cfg)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), AppError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(workers) = lookup("MAX_WORKERS") {
            self.pool.workers = workers
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("MAX_WORKERS must be a number, got {:?}", workers)))?;
        }
        if let Some(token) = lookup("TELEGRAM_BOT_API_KEY") {
            self.telegram.token = token;
        }
        if let Some(chat_id) = lookup("TELEGRAM_GROUP_ID") {
            self.telegram.chat_id = chat_id;
        }
        if let Some(interval) = lookup("CHECK_INTERVAL_SECS") {
            self.polling.check_interval_secs = interval.trim().parse().map_err(|_| {
                AppError::Config(format!("CHECK_INTERVAL_SECS must be a number, got {:?}", interval))
            })?;
        }
        Ok(())
    }

    /// Assets to track: the configured list, or the built-in catalog
    pub fn catalog(&self) -> Vec<AssetInfo> {
        if self.assets.is_empty() {
            default_catalog()
        } else {
            self.assets.clone()
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.polling.check_interval_secs)
    }

    pub fn request_pause(&self) -> Duration {
        Duration::from_secs(self.feed.request_pause_secs)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.pool.workers == 0 {
            return Err(AppError::Config("pool.workers must be at least 1".to_string()));
        }
        if self.telegram.token.trim().is_empty() {
            return Err(AppError::Config("telegram token is missing (TELEGRAM_BOT_API_KEY)".to_string()));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(AppError::Config("telegram chat id is missing (TELEGRAM_GROUP_ID)".to_string()));
        }
        if self.polling.check_interval_secs == 0 {
            return Err(AppError::Config("polling.check_interval_secs must be positive".to_string()));
        }
        if self.feed.request_timeout_secs == 0 {
            return Err(AppError::Config("feed.request_timeout_secs must be positive".to_string()));
        }
        if self.telegram.poll_timeout_secs == 0 {
            return Err(AppError::Config("telegram.poll_timeout_secs must be positive".to_string()));
        }
        if self.feed.lookback_days == 0 {
            return Err(AppError::Config("feed.lookback_days must be at least 1".to_string()));
        }
        if self.feed.currency.trim().is_empty() {
            return Err(AppError::Config("feed.currency is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for asset in &self.assets {
            if asset.id.trim().is_empty() {
                return Err(AppError::Config("asset with empty id".to_string()));
            }
            if !seen.insert(asset.id.as_str()) {
                return Err(AppError::Config(format!("duplicate asset id {}", asset.id)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::utils::generate_id;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        [pool]
        workers = 3

        [telegram]
        token = "123:ABC"
        chat_id = "-1001"

        [polling]
        check_interval_secs = 600

        [[assets]]
        id = "bitcoin"
        symbol = "BTC"
        name = "Bitcoin"
    "#;

    #[test]
    fn test_parse_sample_config() {
        let cfg = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(cfg.pool.workers, 3);
        assert_eq!(cfg.telegram.api_url, "https://api.telegram.org");
        assert_eq!(cfg.feed.lookback_days, 14);
        assert_eq!(cfg.check_interval(), Duration::from_secs(600));
        assert_eq!(cfg.catalog(), vec![AssetInfo::new("bitcoin", "BTC", "Bitcoin")]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults_but_needs_credentials() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.catalog().len(), 10);
        assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MAX_WORKERS", "8"),
            ("TELEGRAM_BOT_API_KEY", "999:XYZ"),
            ("TELEGRAM_GROUP_ID", "-42"),
        ]
        .into_iter()
        .collect();

        let mut cfg = Config::from_toml(SAMPLE).unwrap();
        cfg.apply_env_from(|key| env.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(cfg.pool.workers, 8);
        assert_eq!(cfg.telegram.token, "999:XYZ");
        assert_eq!(cfg.telegram.chat_id, "-42");
        assert_eq!(cfg.polling.check_interval_secs, 600);
    }

    #[test]
    fn test_non_numeric_worker_count_is_fatal() {
        let mut cfg = Config::default();
        let result = cfg.apply_env_from(|key| (key == "MAX_WORKERS").then(|| "many".to_string()));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut cfg = Config::from_toml(SAMPLE).unwrap();
        cfg.pool.workers = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut cfg = Config::from_toml(SAMPLE).unwrap();
        cfg.feed.request_timeout_secs = 0;
        assert!(matches!(cfg.validate(), Err(AppError::Config(_))));

        let mut cfg = Config::from_toml(SAMPLE).unwrap();
        cfg.telegram.poll_timeout_secs = 0;
        assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_missing_env_file_is_not_an_error() {
        let path = std::env::temp_dir().join(format!("ticker-pulse-{}.env", generate_id()));
        let loaded = load_env_file_from(path.to_str().unwrap()).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_env_file_populates_environment() {
        let key = format!("TICKER_PULSE_TEST_{}", generate_id().replace('-', "_"));
        let path = std::env::temp_dir().join(format!("ticker-pulse-{}.env", generate_id()));
        fs::write(&path, format!("{}=-1009\n", key)).unwrap();

        let loaded = load_env_file_from(path.to_str().unwrap()).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(loaded.is_some());
        assert_eq!(std::env::var(&key).unwrap(), "-1009");
    }

    #[test]
    fn test_duplicate_asset_ids_rejected() {
        let mut cfg = Config::from_toml(SAMPLE).unwrap();
        cfg.assets.push(AssetInfo::new("bitcoin", "XBT", "Bitcoin again"));
        assert!(cfg.validate().is_err());
    }
}
