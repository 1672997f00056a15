//! Tile service request and TileJSON response types.
//!
//! `TileRequest` is the strongly typed form of the tilejson query. It is only
//! flattened into query pairs at the network boundary.

use serde::{Deserialize, Serialize};

use crate::dataset::DataMode;

/// Which tilejson endpoint family a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileEndpoint {
    /// `/md/...` multi-dimensional array store.
    Multidim,
    /// `/cog/...` per-file cloud-optimized rasters.
    Cog,
}

impl TileEndpoint {
    pub fn for_mode(mode: DataMode) -> Self {
        match mode {
            DataMode::Multidim => TileEndpoint::Multidim,
            DataMode::Cog => TileEndpoint::Cog,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            TileEndpoint::Multidim => "/md/WebMercatorQuad/tilejson.json",
            TileEndpoint::Cog => "/cog/WebMercatorQuad/tilejson.json",
        }
    }
}

/// Parameters for the "shift" post-processing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmParams {
    pub shift: f64,
}

impl AlgorithmParams {
    /// JSON form sent as the `algorithm_params` query value.
    pub fn to_query_value(&self) -> String {
        serde_json::json!({ "shift": self.shift }).to_string()
    }
}

/// Fully resolved parameters for one tilejson request.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    pub endpoint: TileEndpoint,
    pub variable: String,
    pub time_idx: usize,
    pub rescale: (f64, f64),
    pub colormap_name: String,
    pub algorithm: Option<String>,
    pub algorithm_params: Option<AlgorithmParams>,
    pub url: Option<String>,
    pub mask: Option<String>,
    pub mask_min_value: Option<f64>,
}

impl TileRequest {
    pub fn path(&self) -> &'static str {
        self.endpoint.path()
    }

    /// Flatten into query pairs, in a stable order. Absent optionals are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("variable", self.variable.clone()),
            ("time_idx", self.time_idx.to_string()),
            ("rescale", format!("{},{}", self.rescale.0, self.rescale.1)),
            ("colormap_name", self.colormap_name.clone()),
        ];
        if let Some(algorithm) = &self.algorithm {
            pairs.push(("algorithm", algorithm.clone()));
        }
        if let Some(params) = &self.algorithm_params {
            pairs.push(("algorithm_params", params.to_query_value()));
        }
        if let Some(url) = &self.url {
            pairs.push(("url", url.clone()));
        }
        if let Some(mask) = &self.mask {
            pairs.push(("mask", mask.clone()));
        }
        if let Some(min) = self.mask_min_value {
            pairs.push(("mask_min_value", min.to_string()));
        }
        pairs
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }
}

/// TileJSON document returned by the tile service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileJson {
    pub tiles: Vec<String>,
    #[serde(default)]
    pub minzoom: Option<u32>,
    #[serde(default)]
    pub maxzoom: Option<u32>,
    #[serde(default)]
    pub bounds: Option<[f64; 4]>,
}

impl TileJson {
    /// The url template handed to the renderer.
    pub fn url_template(&self) -> Option<&str> {
        self.tiles.first().map(String::as_str)
    }
}
