//! User-placed time series sample points.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::geo::LatLng;

/// Stable identifier of a sample point. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(pub u64);

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Linear-regression statistics over one point's series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub slope: f64,
    pub intercept: f64,
    #[serde(alias = "rSquared")]
    pub r_squared: f64,
    /// Annualized rate (the service reports mm/year for displacement data).
    #[serde(alias = "ratePerYear", alias = "mm_per_year")]
    pub rate_per_year: f64,
}

/// A sample point placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub id: PointId,
    pub name: String,
    pub position: LatLng,
    /// CSS color string taken from the session palette.
    pub color: String,
    pub visible: bool,
    /// Sampled series per dataset name.
    #[serde(default)]
    pub data: BTreeMap<String, Vec<Option<f64>>>,
    /// Trend statistics per dataset name.
    #[serde(default)]
    pub trend_data: BTreeMap<String, TrendResult>,
}

impl TimeSeriesPoint {
    pub fn new(id: PointId, name: impl Into<String>, position: LatLng, color: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            color: color.into(),
            visible: true,
            data: BTreeMap::new(),
            trend_data: BTreeMap::new(),
        }
    }
}
