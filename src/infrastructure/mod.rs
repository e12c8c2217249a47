//! Infrastructure layer - external collaborators (price feed, chat notifier)

pub mod notifier;
pub mod price_feed;
