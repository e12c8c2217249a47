//! Band calculation over a historical series

use super::PriceSeries;
use crate::shared::errors::BandError;
use crate::shared::types::Band;

/// Reduce a series to its (min, max) value range.
///
/// The first malformed row aborts the whole computation.
pub fn compute_band(series: &PriceSeries) -> Result<Band, BandError> {
    if series.is_empty() {
        return Err(BandError::EmptyData);
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for point in series.points() {
        let point = point?;
        min = min.min(point.value);
        max = max.max(point.value);
    }

    // Every point is finite and the series is non-empty, so the bounds are ordered.
    Band::new(min, max).ok_or(BandError::EmptyData)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_band_min_max() {
        let series = PriceSeries::from_pairs(vec![
            (1_700_000_000_000, 10.0),
            (1_700_086_400_000, 25.0),
            (1_700_172_800_000, 7.0),
        ]);

        let band = compute_band(&series).unwrap();
        assert_eq!(band.min, 7.0);
        assert_eq!(band.max, 25.0);
    }

    #[test]
    fn test_compute_band_single_sample() {
        let series = PriceSeries::from_pairs(vec![(1_700_000_000_000, 42.5)]);
        let band = compute_band(&series).unwrap();
        assert_eq!(band, Band { min: 42.5, max: 42.5 });
    }

    #[test]
    fn test_compute_band_empty_series() {
        let series = PriceSeries::default();
        assert_eq!(compute_band(&series), Err(BandError::EmptyData));
    }

    #[test]
    fn test_compute_band_rejects_three_element_row() {
        let series = PriceSeries::from_rows(vec![
            vec![1_700_000_000_000.0, 10.0],
            vec![1_700_086_400_000.0, 25.0, 3.0],
            vec![1_700_172_800_000.0, 1.0],
        ]);

        match compute_band(&series) {
            Err(BandError::MalformedData { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected malformed data error, got {:?}", other),
        }
    }

    #[test]
    fn test_compute_band_is_deterministic() {
        let series = PriceSeries::from_pairs((0..50).map(|i| (i * 86_400_000, ((i * 37) % 11) as f64)));
        assert_eq!(compute_band(&series), compute_band(&series));
        assert_eq!(compute_band(&series).unwrap(), Band { min: 0.0, max: 10.0 });
    }
}
