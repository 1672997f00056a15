//! Synthetic series generators.
//!
//! Values are predictable so tests can check exactly what reached the chart.

use bowser_common::{LatLng, TrendResult};

/// Days per year used to annualize slopes.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Creates a linear series: `start + i * step`.
///
/// # Example
///
/// ```
/// use test_utils::linear_series;
///
/// let series = linear_series(3, 1.0, 0.5);
/// assert_eq!(series, vec![Some(1.0), Some(1.5), Some(2.0)]);
/// ```
pub fn linear_series(len: usize, start: f64, step: f64) -> Vec<Option<f64>> {
    (0..len).map(|i| Some(start + i as f64 * step)).collect()
}

/// Linear series with every `every`-th entry missing (starting at index 0).
pub fn series_with_gaps(len: usize, every: usize) -> Vec<Option<f64>> {
    linear_series(len, 0.0, 1.0)
        .into_iter()
        .enumerate()
        .map(|(i, v)| if every > 0 && i % every == 0 { None } else { v })
        .collect()
}

/// Series sampled at `position`: starts at the latitude and rises by a step
/// derived from the longitude, so different points give different series.
pub fn series_at(position: LatLng, len: usize) -> Vec<Option<f64>> {
    linear_series(len, position.lat, step_at(position))
}

/// The trend a perfect fit of [`series_at`] would report.
pub fn trend_at(position: LatLng) -> TrendResult {
    let slope = step_at(position);
    TrendResult {
        slope,
        intercept: position.lat,
        r_squared: 1.0,
        rate_per_year: slope * DAYS_PER_YEAR,
    }
}

fn step_at(position: LatLng) -> f64 {
    position.lng.abs().round() / 1000.0
}
