//! Raster group (dataset) metadata served by the catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::geo::LatLonBounds;
use crate::time::XValue;

/// The full dataset catalog, keyed by dataset name.
///
/// A `BTreeMap` keeps "first dataset" selection and listing order stable.
pub type Catalog = BTreeMap<String, RasterGroup>;

/// Algorithm tag that subtracts a reference series from each tile.
pub const SHIFT_ALGORITHM: &str = "shift";

/// A named, time-indexed stack of rasters for one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterGroup {
    pub name: String,

    /// Per-time raster references (COG urls or paths).
    #[serde(default)]
    pub file_list: Vec<String>,

    /// Optional per-time mask rasters, parallel to `file_list`.
    #[serde(default)]
    pub mask_file_list: Vec<String>,

    #[serde(default)]
    pub mask_min_value: Option<f64>,

    #[serde(default)]
    pub nodata: Option<f64>,

    /// Values are relative to a spatial reference point (e.g. unwrapped phase).
    #[serde(default)]
    pub uses_spatial_ref: bool,

    /// Tile post-processing algorithm, e.g. "shift", "phase", "amplitude".
    #[serde(default)]
    pub algorithm: Option<String>,

    #[serde(default)]
    pub latlon_bounds: Option<LatLonBounds>,

    /// Time axis. Valid time indices are `0..x_values.len()`.
    #[serde(default)]
    pub x_values: Vec<XValue>,
}

impl RasterGroup {
    /// Number of entries on the time axis.
    pub fn time_len(&self) -> usize {
        self.x_values.len()
    }

    /// Clamp any requested index into `[0, time_len - 1]`.
    ///
    /// An empty time axis clamps to 0.
    pub fn clamp_time_index(&self, index: i64) -> usize {
        let max = self.time_len().saturating_sub(1) as i64;
        index.clamp(0, max) as usize
    }

    pub fn is_shift(&self) -> bool {
        self.algorithm.as_deref() == Some(SHIFT_ALGORITHM)
    }

    pub fn file_at(&self, index: usize) -> Option<&str> {
        self.file_list.get(index).map(String::as_str)
    }

    pub fn mask_at(&self, index: usize) -> Option<&str> {
        self.mask_file_list
            .get(index)
            .map(String::as_str)
            .filter(|m| !m.is_empty())
    }

    pub fn x_value_at(&self, index: usize) -> Option<&XValue> {
        self.x_values.get(index)
    }
}

/// Backend addressing family for tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataMode {
    /// Multi-dimensional array store, addressed by variable + time index.
    #[default]
    #[serde(rename = "md")]
    Multidim,
    /// Per-file cloud-optimized rasters, addressed by url.
    #[serde(rename = "cog")]
    Cog,
}

impl DataMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataMode::Multidim => "md",
            DataMode::Cog => "cog",
        }
    }
}

impl std::fmt::Display for DataMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response body of `GET /mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeResponse {
    pub mode: DataMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(len: usize) -> RasterGroup {
        RasterGroup {
            name: "disp".to_string(),
            file_list: (0..len).map(|i| format!("f{i}.tif")).collect(),
            mask_file_list: vec![],
            mask_min_value: None,
            nodata: None,
            uses_spatial_ref: false,
            algorithm: None,
            latlon_bounds: None,
            x_values: (0..len as i64).map(XValue::Index).collect(),
        }
    }

    #[test]
    fn test_clamp_time_index() {
        let g = group(3);
        assert_eq!(g.clamp_time_index(-5), 0);
        assert_eq!(g.clamp_time_index(1), 1);
        assert_eq!(g.clamp_time_index(99), 2);
        assert_eq!(group(0).clamp_time_index(7), 0);
    }

    #[test]
    fn test_mode_wire_values() {
        let m: ModeResponse = serde_json::from_str(r#"{"mode":"md"}"#).unwrap();
        assert_eq!(m.mode, DataMode::Multidim);
        let m: ModeResponse = serde_json::from_str(r#"{"mode":"cog"}"#).unwrap();
        assert_eq!(m.mode, DataMode::Cog);
    }

    #[test]
    fn test_empty_mask_entry_is_absent() {
        let mut g = group(2);
        g.mask_file_list = vec!["".to_string(), "m1.tif".to_string()];
        assert_eq!(g.mask_at(0), None);
        assert_eq!(g.mask_at(1), Some("m1.tif"));
        assert_eq!(g.mask_at(5), None);
    }
}
