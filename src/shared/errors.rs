//! Error handling for the application

use thiserror::Error;

/// Price feed errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Price feed transport failed: {0}")]
    Transport(String),

    #[error("Price feed payload could not be decoded: {0}")]
    Decode(String),
}

// Request URLs are stripped: the Telegram one carries the bot token.
impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_decode() {
            FeedError::Decode(err.to_string())
        } else {
            FeedError::Transport(err.to_string())
        }
    }
}

/// Notifier (chat transport) errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifierError {
    #[error("Notifier transport failed: {0}")]
    Transport(String),

    #[error("Notifier API rejected the request: {0}")]
    Api(String),

    #[error("Notifier response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for NotifierError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_decode() {
            NotifierError::Decode(err.to_string())
        } else {
            NotifierError::Transport(err.to_string())
        }
    }
}

/// Band calculation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BandError {
    #[error("Price series is empty")]
    EmptyData,

    #[error("Malformed price series entry at index {index}: {reason}")]
    MalformedData { index: usize, reason: String },
}

/// Worker pool errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Invalid worker pool size: {0} (must be at least 1)")]
    InvalidConfig(usize),

    #[error("Task queue is closed")]
    QueueClosed,
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Notifier(#[from] NotifierError),

    #[error(transparent)]
    Band(#[from] BandError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}
