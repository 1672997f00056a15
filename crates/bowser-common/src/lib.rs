//! Common types and utilities shared across the Bowser client crates.

pub mod api;
pub mod chart;
pub mod dataset;
pub mod error;
pub mod geo;
pub mod point;
pub mod style;
pub mod tile;
pub mod time;

pub use api::BowserApi;
pub use chart::{ChartData, ChartDataset, ChartStatus, MultiPointRequest, PointPayload};
pub use dataset::{Catalog, DataMode, ModeResponse, RasterGroup};
pub use error::{BowserError, BowserResult};
pub use geo::{LatLng, LatLonBounds};
pub use point::{PointId, TimeSeriesPoint, TrendResult};
pub use style::{ColorScaleConfig, DEFAULT_PALETTE};
pub use tile::{AlgorithmParams, TileEndpoint, TileJson, TileRequest};
pub use time::XValue;
