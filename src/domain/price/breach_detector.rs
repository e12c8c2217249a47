//! Breach detection: compare current prices against tracked bands

use super::{PriceSnapshot, QuoteLookup};
use crate::shared::types::TrackedAsset;
use tracing::{debug, warn};

/// Alert raised when a price leaves its tracked band
#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    BelowBand { asset: TrackedAsset, price: f64 },
    AboveBand { asset: TrackedAsset, price: f64 },
}

impl AlertEvent {
    pub fn asset(&self) -> &TrackedAsset {
        match self {
            AlertEvent::BelowBand { asset, .. } | AlertEvent::AboveBand { asset, .. } => asset,
        }
    }
}

/// Check every banded asset against the snapshot.
///
/// Events follow the order of `assets`. Assets without a band are skipped, as
/// are assets whose price is missing or malformed in the snapshot.
pub fn detect_breaches(assets: &[TrackedAsset], prices: &PriceSnapshot) -> Vec<AlertEvent> {
    let mut events = Vec::new();

    for asset in assets {
        let Some(band) = asset.band else {
            debug!("{}: band not computed yet, skipping", asset.id());
            continue;
        };

        let price = match prices.lookup(asset.id()) {
            QuoteLookup::Price(price) => price,
            QuoteLookup::Missing => {
                warn!("No {} price for {}", prices.currency(), asset.id());
                continue;
            }
            QuoteLookup::Malformed => {
                warn!("Malformed {} price entry for {}", prices.currency(), asset.id());
                continue;
            }
        };

        debug!(
            "{}: {} (min: {}, max: {})",
            asset.name(),
            price,
            band.min,
            band.max
        );

        // Two independent checks; an inverted band would raise both.
        if price < band.min {
            events.push(AlertEvent::BelowBand {
                asset: asset.clone(),
                price,
            });
        }
        if price > band.max {
            events.push(AlertEvent::AboveBand {
                asset: asset.clone(),
                price,
            });
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::{AssetInfo, Band};
    use chrono::Utc;

    fn banded(id: &str, min: f64, max: f64) -> TrackedAsset {
        TrackedAsset::new(AssetInfo::new(id, id.to_uppercase(), id))
            .with_band(Band { min, max }, Utc::now())
    }

    #[test]
    fn test_price_below_band() {
        let assets = vec![banded("bitcoin", 100.0, 200.0)];
        let snapshot = PriceSnapshot::new("usd").with_price("bitcoin", 95.0);

        let events = detect_breaches(&assets, &snapshot);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], AlertEvent::BelowBand { price, .. } if price == 95.0));
    }

    #[test]
    fn test_price_above_band() {
        let assets = vec![banded("bitcoin", 100.0, 200.0)];
        let snapshot = PriceSnapshot::new("usd").with_price("bitcoin", 250.0);

        let events = detect_breaches(&assets, &snapshot);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], AlertEvent::AboveBand { price, .. } if price == 250.0));
    }

    #[test]
    fn test_price_inside_band_and_on_edges() {
        let assets = vec![banded("bitcoin", 100.0, 200.0)];
        for price in [100.0, 150.0, 200.0] {
            let snapshot = PriceSnapshot::new("usd").with_price("bitcoin", price);
            assert!(detect_breaches(&assets, &snapshot).is_empty());
        }
    }

    #[test]
    fn test_unset_band_is_skipped() {
        let assets = vec![TrackedAsset::new(AssetInfo::new("bitcoin", "BTC", "Bitcoin"))];
        let snapshot = PriceSnapshot::new("usd").with_price("bitcoin", 1.0);
        assert!(detect_breaches(&assets, &snapshot).is_empty());
    }

    #[test]
    fn test_missing_and_malformed_prices_do_not_stop_processing() {
        let assets = vec![
            banded("bitcoin", 100.0, 200.0),
            banded("tether", 0.99, 1.01),
            banded("solana", 10.0, 20.0),
        ];
        let snapshot = PriceSnapshot::new("usd")
            .with_malformed("tether")
            .with_price("solana", 5.0);

        let events = detect_breaches(&assets, &snapshot);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].asset().id(), "solana");
    }

    #[test]
    fn test_events_follow_asset_order() {
        let assets = vec![
            banded("solana", 10.0, 20.0),
            banded("bitcoin", 100.0, 200.0),
            banded("cardano", 1.0, 2.0),
        ];
        let snapshot = PriceSnapshot::new("usd")
            .with_price("bitcoin", 300.0)
            .with_price("cardano", 0.5)
            .with_price("solana", 30.0);

        let ids: Vec<_> = detect_breaches(&assets, &snapshot)
            .iter()
            .map(|e| e.asset().id().to_string())
            .collect();
        assert_eq!(ids, vec!["solana", "bitcoin", "cardano"]);
    }

    #[test]
    fn test_inverted_band_raises_both_events() {
        let assets = vec![banded("bitcoin", 200.0, 100.0)];
        let snapshot = PriceSnapshot::new("usd").with_price("bitcoin", 150.0);

        let events = detect_breaches(&assets, &snapshot);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AlertEvent::BelowBand { .. }));
        assert!(matches!(events[1], AlertEvent::AboveBand { .. }));
    }
}
