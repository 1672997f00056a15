//! Client-side synchronization engine for the Bowser raster browser.
//!
//! The engine owns one [`StateStore`] per [`Session`] and keeps three flows in
//! step with it:
//! - tile requests derived from the active dataset and color scale
//!   ([`TileRequestBuilder`], [`TileFetcher`]),
//! - reference shift series cached per dataset ([`ReferenceShiftResolver`]),
//! - batched multi-point time series for the chart ([`TimeSeriesAggregator`]).
//!
//! Backend calls go through [`bowser_common::BowserApi`]; [`HttpBackend`] is
//! the production implementation.

pub mod aggregator;
pub mod config;
pub mod http;
pub mod metrics;
pub mod points;
pub mod preferences;
pub mod reference;
pub mod sequence;
pub mod session;
pub mod state;
pub mod tile_request;

pub use aggregator::{AggregatorPlan, TimeSeriesAggregator};
pub use config::EngineConfig;
pub use http::HttpBackend;
pub use points::{PointRegistry, PointUpdate};
pub use preferences::{JsonFileStore, KeyValueStore, MemoryStore, PreferenceStore, ScalePreferences};
pub use reference::{ReferenceRequest, ReferenceShiftResolver};
pub use sequence::{Flow, RequestSequence};
pub use session::{Completion, Session};
pub use state::{reduce, Action, AppState, ChartState, StateStore};
pub use tile_request::{TileFetcher, TileRequestBuilder};
