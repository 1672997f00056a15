//! Backend contract consumed by the engine.
//!
//! Every external service the client talks to is reached through this trait,
//! so the engine can run against HTTP or against a scripted backend in tests.

use async_trait::async_trait;

use crate::chart::{ChartData, MultiPointRequest};
use crate::dataset::{Catalog, DataMode};
use crate::error::BowserResult;
use crate::geo::LatLng;
use crate::point::TrendResult;
use crate::tile::{TileJson, TileRequest};

#[async_trait]
pub trait BowserApi: Send + Sync {
    /// `GET /datasets`
    async fn datasets(&self) -> BowserResult<Catalog>;

    /// `GET /mode`
    async fn mode(&self) -> BowserResult<DataMode>;

    /// `GET {tilejson path}?...`
    async fn tile_json(&self, request: &TileRequest) -> BowserResult<TileJson>;

    /// `GET /point`: one value per time index, `None` where no data.
    async fn point_series(&self, dataset: &str, position: LatLng) -> BowserResult<Vec<Option<f64>>>;

    /// `POST /multi_point`
    async fn multi_point(&self, request: &MultiPointRequest) -> BowserResult<ChartData>;

    /// `GET /trend_analysis/{dataset}`
    async fn trend_analysis(
        &self,
        dataset: &str,
        position: LatLng,
        reference: Option<LatLng>,
    ) -> BowserResult<TrendResult>;
}
