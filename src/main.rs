use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ticker_pulse::config::load_env_file;
use ticker_pulse::{
    BotSettings, CoinGeckoClient, Config, PulseBot, TelegramNotifier, TrackedAssets, WorkerPool,
};

#[derive(Parser, Debug)]
#[command(version, about = "Crypto price band watcher with Telegram notifications")]
struct Args {
    /// Path to config file (optional, env and defaults otherwise)
    #[arg(long)]
    config: Option<String>,

    /// Number of pool workers (overrides MAX_WORKERS and config)
    #[arg(long)]
    workers: Option<usize>,

    /// Breach-check interval in seconds (overrides config)
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Loaded before logging so RUST_LOG may come from the env file too
    let env_file = load_env_file()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(path) = env_file {
        info!("Loaded environment from {}", path.display());
    }

    // Priority: CLI args > environment (incl. env file) > config file > defaults
    let mut cfg = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    cfg.apply_env()?;
    if let Some(workers) = args.workers {
        cfg.pool.workers = workers;
    }
    if let Some(interval) = args.interval_secs {
        cfg.polling.check_interval_secs = interval;
    }
    cfg.validate()?;

    let notifier = TelegramNotifier::connect(&cfg.telegram)
        .await
        .context("initialize Telegram notifier")?;
    let feed = CoinGeckoClient::new(&cfg.feed)?;
    let pool = WorkerPool::new(cfg.pool.workers)?;

    let bot = PulseBot::new(
        Arc::new(feed),
        Arc::new(notifier),
        pool,
        TrackedAssets::from_catalog(cfg.catalog()),
        BotSettings::from_config(&cfg),
    );

    bot.start()?;

    wait_for_shutdown().await?;
    info!("Shutting down..");
    bot.stop().await;

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}
