//! Chat message texts and the current-quotes table

use crate::domain::price::{AlertEvent, PriceSnapshot};
use crate::shared::types::TrackedAsset;
use std::fmt::Write;

pub const GREETING: &str = "Hello 🌍 I'm keeping a finger on the pulse and will let you know if anything moves. 🚀";
pub const MENU_TITLE: &str = "📋 Main menu:";
pub const QUOTES_BUTTON: &str = "📊 Current quotes";
pub const QUOTES_REQUESTED: &str = "🔄 Fetching current quotes..";
pub const QUOTES_FORMAT_FAILED: &str = "⚠️ Failed to format quotes, please try again later.";

/// Event id bound to the "current quotes" menu button
pub const CURRENT_QUOTES_EVENT: &str = "CURRENT_QUOTES_RATE";

/// Notification text for a band breach
pub fn alert_message(event: &AlertEvent, lookback_days: u32, currency: &str) -> String {
    let currency = currency.to_uppercase();
    match event {
        AlertEvent::BelowBand { asset, price } => format!(
            "⬇️ {} {}, dropped below the {}-day low: {:.2} {}",
            asset.name(),
            asset.symbol(),
            lookback_days,
            price,
            currency
        ),
        AlertEvent::AboveBand { asset, price } => format!(
            "⬆️ {} {}, rose above the {}-day high: {:.2} {}",
            asset.name(),
            asset.symbol(),
            lookback_days,
            price,
            currency
        ),
    }
}

/// One row per priced asset, ascending by asset id.
///
/// Returns `None` when no tracked asset has a usable price.
pub fn quotes_table(assets: &[TrackedAsset], snapshot: &PriceSnapshot) -> Option<String> {
    let currency = snapshot.currency().to_uppercase();
    let mut table = String::new();
    let mut rows = 0;

    for (id, price) in snapshot.prices() {
        let Some(asset) = assets.iter().find(|a| a.id() == id) else {
            continue;
        };
        // Writing into a String cannot fail.
        let _ = writeln!(
            table,
            "{:<18} {:<6} {:>15.2} {}",
            asset.name(),
            asset.symbol(),
            price,
            currency
        );
        rows += 1;
    }

    (rows > 0).then_some(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::{AssetInfo, Band};
    use chrono::Utc;

    fn assets() -> Vec<TrackedAsset> {
        vec![
            TrackedAsset::new(AssetInfo::new("solana", "SOL", "Solana")),
            TrackedAsset::new(AssetInfo::new("bitcoin", "BTC", "Bitcoin")),
        ]
    }

    #[test]
    fn test_quotes_table_sorted_by_id_and_right_aligned() {
        let snapshot = PriceSnapshot::new("usd")
            .with_price("solana", 151.456)
            .with_price("bitcoin", 65000.0)
            .with_price("unknown-coin", 1.0);

        let table = quotes_table(&assets(), &snapshot).unwrap();
        let lines: Vec<_> = table.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Bitcoin"));
        assert!(lines[0].ends_with("65000.00 USD"));
        assert!(lines[1].starts_with("Solana"));
        assert!(lines[1].ends_with("151.46 USD"));
        assert_eq!(lines[0].len(), lines[1].len());
    }

    #[test]
    fn test_quotes_table_without_prices() {
        let snapshot = PriceSnapshot::new("usd").with_malformed("bitcoin");
        assert!(quotes_table(&assets(), &snapshot).is_none());
    }

    #[test]
    fn test_alert_messages() {
        let asset = TrackedAsset::new(AssetInfo::new("bitcoin", "BTC", "Bitcoin"))
            .with_band(Band { min: 100.0, max: 200.0 }, Utc::now());

        let below = alert_message(
            &AlertEvent::BelowBand { asset: asset.clone(), price: 95.0 },
            14,
            "usd",
        );
        assert_eq!(below, "⬇️ Bitcoin BTC, dropped below the 14-day low: 95.00 USD");

        let above = alert_message(&AlertEvent::AboveBand { asset, price: 250.5 }, 14, "usd");
        assert_eq!(above, "⬆️ Bitcoin BTC, rose above the 14-day high: 250.50 USD");
    }
}
