//! Polling orchestrator: band refresh, breach-check loop and on-demand quotes

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::report::{self, CURRENT_QUOTES_EVENT};
use super::tracked_assets::TrackedAssets;
use super::worker_pool::WorkerPool;
use crate::config::Config;
use crate::domain::price::{compute_band, detect_breaches};
use crate::infrastructure::notifier::{EventHandlers, MenuButton, Notifier};
use crate::infrastructure::price_feed::PriceFeed;
use crate::shared::errors::{AppError, PoolError};

/// Workers held for the bot's whole lifetime: event listener + breach loop
const LONG_RUNNING_TASKS: usize = 2;

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub currency: String,
    pub lookback_days: u32,
    /// Pause between per-asset history requests
    pub request_pause: Duration,
    pub check_interval: Duration,
}

impl BotSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            currency: cfg.feed.currency.clone(),
            lookback_days: cfg.feed.lookback_days,
            request_pause: cfg.request_pause(),
            check_interval: cfg.check_interval(),
        }
    }
}

/// Owns the tracked assets and schedules all background work on the pool.
///
/// Cloning is cheap; clones share the same pool, collaborators and assets.
#[derive(Clone)]
pub struct PulseBot {
    feed: Arc<dyn PriceFeed>,
    notifier: Arc<dyn Notifier>,
    pool: Arc<WorkerPool>,
    assets: TrackedAssets,
    settings: Arc<BotSettings>,
}

impl PulseBot {
    pub fn new(
        feed: Arc<dyn PriceFeed>,
        notifier: Arc<dyn Notifier>,
        pool: WorkerPool,
        assets: TrackedAssets,
        settings: BotSettings,
    ) -> Self {
        Self {
            feed,
            notifier,
            pool: Arc::new(pool),
            assets,
            settings: Arc::new(settings),
        }
    }

    /// Read access to the tracked assets
    pub fn assets(&self) -> &TrackedAssets {
        &self.assets
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Start the pool and submit the startup sequence
    pub fn start(&self) -> Result<(), PoolError> {
        info!(
            "Bot started: {} assets, check every {:?}",
            self.assets.len(),
            self.settings.check_interval
        );
        if self.pool.size() <= LONG_RUNNING_TASKS {
            warn!(
                "Worker pool has {} workers; {} are held by long-running tasks, on-demand requests may starve",
                self.pool.size(),
                LONG_RUNNING_TASKS
            );
        }

        self.pool.start()?;
        self.send_message_async(report::GREETING)?;
        self.create_menu_async()?;
        // The handler table is frozen before the listener task can receive anything.
        self.listen_for_events_async(self.event_handlers())?;
        self.refresh_bands_async()?;
        self.check_breaches_by_interval()?;
        Ok(())
    }

    /// Stop accepting work, wait for queued and running tasks
    pub async fn stop(&self) {
        self.pool.stop().await;
        info!("Bot stopped");
    }

    pub fn send_message_async(&self, text: impl Into<String>) -> Result<(), PoolError> {
        let notifier = Arc::clone(&self.notifier);
        let text = text.into();
        self.pool.submit(async move {
            match notifier.send_message(&text).await {
                Ok(()) => debug!("Message sent"),
                Err(e) => error!("Failed to send message: {}", e),
            }
        })
    }

    pub fn create_menu_async(&self) -> Result<(), PoolError> {
        let notifier = Arc::clone(&self.notifier);
        self.pool.submit(async move {
            let buttons = [MenuButton::new(report::QUOTES_BUTTON, CURRENT_QUOTES_EVENT)];
            match notifier.create_menu(report::MENU_TITLE, &buttons).await {
                Ok(()) => info!("Menu created"),
                Err(e) => error!("Failed to create menu: {}", e),
            }
        })
    }

    pub fn listen_for_events_async(&self, handlers: EventHandlers) -> Result<(), PoolError> {
        let notifier = Arc::clone(&self.notifier);
        let shutdown = self.pool.shutdown_signal();
        self.pool.submit(async move {
            if let Err(e) = notifier.listen_for_events(&handlers, shutdown).await {
                error!("Event listener failed: {}", e);
            }
        })
    }

    /// Handlers for every menu event
    pub fn event_handlers(&self) -> EventHandlers {
        let bot = self.clone();
        EventHandlers::builder()
            .on(CURRENT_QUOTES_EVENT, move || {
                if let Err(e) = bot.report_current_quotes_async() {
                    warn!("Cannot schedule quotes report: {}", e);
                }
            })
            .build()
    }

    /// Acknowledge, then send the current quotes table
    pub fn report_current_quotes_async(&self) -> Result<(), PoolError> {
        let bot = self.clone();
        self.pool.submit(async move {
            if let Err(e) = bot.notifier.send_message(report::QUOTES_REQUESTED).await {
                error!("Failed to send message: {}", e);
            }
            if let Err(e) = bot.report_current_quotes().await {
                error!("Failed to report current quotes: {}", e);
            }
        })
    }

    pub async fn report_current_quotes(&self) -> Result<(), AppError> {
        let assets = self.assets.snapshot();
        let ids: Vec<String> = assets.iter().map(|a| a.id().to_string()).collect();
        let snapshot = self.feed.fetch_snapshot(&ids, &self.settings.currency).await?;

        match report::quotes_table(&assets, &snapshot) {
            Some(table) => self.notifier.send_message(&table).await?,
            None => {
                warn!("No usable prices in snapshot of {} entries", snapshot.len());
                self.notifier.send_message(report::QUOTES_FORMAT_FAILED).await?;
            }
        }
        Ok(())
    }

    pub fn refresh_bands_async(&self) -> Result<(), PoolError> {
        let bot = self.clone();
        self.pool.submit(async move {
            if let Err(e) = bot.refresh_bands().await {
                error!("Band refresh aborted, keeping previous bands: {}", e);
            }
        })
    }

    /// Recompute every band, one asset at a time.
    ///
    /// Any failure aborts the pass and leaves the published assets untouched;
    /// on success the whole list is replaced at once.
    pub async fn refresh_bands(&self) -> Result<(), AppError> {
        let current = self.assets.snapshot();
        let mut shutdown = self.pool.shutdown_signal();
        let mut updated = Vec::with_capacity(current.len());

        for (i, asset) in current.iter().enumerate() {
            if i > 0 {
                let interrupted = if self.settings.request_pause.is_zero() {
                    shutdown.is_triggered()
                } else {
                    tokio::select! {
                        _ = shutdown.triggered() => true,
                        _ = tokio::time::sleep(self.settings.request_pause) => false,
                    }
                };
                if interrupted {
                    info!("Band refresh interrupted by shutdown");
                    return Ok(());
                }
            }

            let series = self
                .feed
                .fetch_historical_series(asset.id(), self.settings.lookback_days)
                .await?;
            let band = compute_band(&series)?;
            info!("{} min / max: {:.2} / {:.2}", asset.symbol(), band.min, band.max);

            updated.push(asset.with_band(band, Utc::now()));
        }

        self.assets.replace(updated);
        info!("Bands refreshed for {} assets", current.len());
        Ok(())
    }

    /// Submit the breach-check loop; it runs until shutdown
    pub fn check_breaches_by_interval(&self) -> Result<(), PoolError> {
        let bot = self.clone();
        let mut shutdown = self.pool.shutdown_signal();
        self.pool.submit(async move {
            // `interval` panics on a zero period.
            let period = bot.settings.check_interval.max(Duration::from_millis(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.triggered() => break,
                    _ = ticker.tick() => {}
                }

                match bot.check_breaches().await {
                    Ok(alerts) => debug!("Breach check done, {} alerts", alerts),
                    Err(e) => warn!("Breach check failed: {}", e),
                }
            }

            info!("Breach-check loop stopped");
        })
    }

    /// One breach-check iteration; returns the number of alerts raised
    pub async fn check_breaches(&self) -> Result<usize, AppError> {
        let assets = self.assets.snapshot();
        let ids: Vec<String> = assets.iter().map(|a| a.id().to_string()).collect();
        let snapshot = self.feed.fetch_snapshot(&ids, &self.settings.currency).await?;

        let events = detect_breaches(&assets, &snapshot);
        for event in &events {
            let text = report::alert_message(event, self.settings.lookback_days, snapshot.currency());
            info!("{}", text);
            if let Err(e) = self.notifier.send_message(&text).await {
                error!("Failed to send alert for {}: {}", event.asset().id(), e);
            }
        }

        Ok(events.len())
    }
}
