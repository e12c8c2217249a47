//! Application layer - worker pool and the polling orchestrator

pub mod bot;
pub mod report;
pub mod tracked_assets;
pub mod worker_pool;

pub use bot::{BotSettings, PulseBot};
pub use tracked_assets::TrackedAssets;
pub use worker_pool::{PoolState, Task, WorkerPool};
