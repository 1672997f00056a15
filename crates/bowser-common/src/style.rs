//! Color scale settings and the point color palette.

use serde::{Deserialize, Serialize};

/// Fixed ordered palette used for sample point colors.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// How raster values are mapped to colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScaleConfig {
    /// Matplotlib-style colormap name understood by the tile service.
    #[serde(default = "default_colormap")]
    pub colormap_name: String,
    #[serde(default = "default_vmin")]
    pub vmin: f64,
    #[serde(default = "default_vmax")]
    pub vmax: f64,
    /// Layer opacity in [0, 1]; applied by the renderer, not the tile service.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_colormap() -> String {
    "rdbu_r".to_string()
}

fn default_vmin() -> f64 {
    -1.0
}

fn default_vmax() -> f64 {
    1.0
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for ColorScaleConfig {
    fn default() -> Self {
        Self {
            colormap_name: default_colormap(),
            vmin: default_vmin(),
            vmax: default_vmax(),
            opacity: default_opacity(),
        }
    }
}

impl ColorScaleConfig {
    /// The tile service `rescale` parameter: "vmin,vmax".
    pub fn rescale_param(&self) -> String {
        format!("{},{}", self.vmin, self.vmax)
    }
}
