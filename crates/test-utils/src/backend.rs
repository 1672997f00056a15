//! Scripted in-process backend.
//!
//! Answers every [`BowserApi`] call from fixtures and generators, records the
//! calls it received, and can be told to fail an endpoint or to hold
//! multi-point responses until released. Holding lets a test force responses
//! to complete out of order.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bowser_common::{
    BowserApi, BowserError, BowserResult, Catalog, ChartData, ChartDataset, DataMode, LatLng,
    MultiPointRequest, TileJson, TileRequest, TrendResult,
};
use tokio::sync::Semaphore;

use crate::fixtures::sample_catalog;
use crate::generators::{series_at, trend_at};

/// Endpoints a test can make fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Datasets,
    Mode,
    TileJson,
    Point,
    MultiPoint,
    Trend,
}

/// A call received by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Datasets,
    Mode,
    TileJson(TileRequest),
    Point {
        dataset: String,
        position: LatLng,
    },
    MultiPoint(MultiPointRequest),
    Trend {
        dataset: String,
        position: LatLng,
        reference: Option<LatLng>,
    },
}

#[derive(Default)]
struct Script {
    catalog: Catalog,
    mode: DataMode,
    point_series: HashMap<String, Vec<Option<f64>>>,
    failing: HashSet<Endpoint>,
    calls: Vec<Call>,
    multi_point_gates: HashMap<usize, Arc<Semaphore>>,
}

/// See the module docs.
pub struct ScriptedBackend {
    script: Mutex<Script>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new(sample_catalog())
    }
}

impl ScriptedBackend {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            script: Mutex::new(Script {
                catalog,
                ..Default::default()
            }),
        }
    }

    pub fn shared(catalog: Catalog) -> Arc<Self> {
        Arc::new(Self::new(catalog))
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_mode(&self, mode: DataMode) {
        self.script().mode = mode;
    }

    /// Serve `values` from `/point` for `dataset`, wherever the point is.
    pub fn set_point_series(&self, dataset: &str, values: Vec<Option<f64>>) {
        self.script().point_series.insert(dataset.to_string(), values);
    }

    pub fn fail(&self, endpoint: Endpoint) {
        self.script().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.script().failing.remove(&endpoint);
    }

    /// Block `/multi_point` requests carrying exactly `points` points until
    /// [`release_multi_point`](Self::release_multi_point) is called.
    pub fn hold_multi_point(&self, points: usize) {
        self.script()
            .multi_point_gates
            .insert(points, Arc::new(Semaphore::new(0)));
    }

    /// Let one held `/multi_point` request with `points` points complete.
    pub fn release_multi_point(&self, points: usize) {
        if let Some(gate) = self.script().multi_point_gates.get(&points) {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script().calls.clone()
    }

    pub fn multi_point_calls(&self) -> Vec<MultiPointRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::MultiPoint(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub fn tile_calls(&self) -> Vec<TileRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::TileJson(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub fn point_calls(&self) -> Vec<(String, LatLng)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Point { dataset, position } => Some((dataset, position)),
                _ => None,
            })
            .collect()
    }

    /// Record `call` and report whether its endpoint is set to fail.
    fn record(&self, endpoint: Endpoint, call: Call) -> BowserResult<()> {
        let mut script = self.script();
        script.calls.push(call);
        if script.failing.contains(&endpoint) {
            return Err(BowserError::network(
                format!("{:?}", endpoint),
                "scripted failure",
            ));
        }
        Ok(())
    }

    fn time_len(&self, dataset: &str) -> BowserResult<usize> {
        self.script()
            .catalog
            .get(dataset)
            .map(|g| g.time_len())
            .ok_or_else(|| BowserError::DatasetNotFound(dataset.to_string()))
    }
}

#[async_trait]
impl BowserApi for ScriptedBackend {
    async fn datasets(&self) -> BowserResult<Catalog> {
        self.record(Endpoint::Datasets, Call::Datasets)?;
        Ok(self.script().catalog.clone())
    }

    async fn mode(&self) -> BowserResult<DataMode> {
        self.record(Endpoint::Mode, Call::Mode)?;
        Ok(self.script().mode)
    }

    async fn tile_json(&self, request: &TileRequest) -> BowserResult<TileJson> {
        self.record(Endpoint::TileJson, Call::TileJson(request.clone()))?;
        let query: Vec<String> = request
            .query_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        Ok(TileJson {
            tiles: vec![format!(
                "http://tiles.test{}/{{z}}/{{x}}/{{y}}?{}",
                request.path().trim_end_matches("/tilejson.json"),
                query.join("&")
            )],
            minzoom: Some(0),
            maxzoom: Some(18),
            bounds: None,
        })
    }

    async fn point_series(&self, dataset: &str, position: LatLng) -> BowserResult<Vec<Option<f64>>> {
        self.record(
            Endpoint::Point,
            Call::Point {
                dataset: dataset.to_string(),
                position,
            },
        )?;
        if let Some(values) = self.script().point_series.get(dataset) {
            return Ok(values.clone());
        }
        Ok(series_at(position, self.time_len(dataset)?))
    }

    async fn multi_point(&self, request: &MultiPointRequest) -> BowserResult<ChartData> {
        let gate = self
            .script()
            .multi_point_gates
            .get(&request.points.len())
            .cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.record(Endpoint::MultiPoint, Call::MultiPoint(request.clone()))?;
        let labels = self
            .script()
            .catalog
            .get(&request.dataset_name)
            .map(|g| g.x_values.clone())
            .ok_or_else(|| BowserError::DatasetNotFound(request.dataset_name.clone()))?;

        let datasets = request
            .points
            .iter()
            .map(|p| {
                let position = LatLng::new(p.lat, p.lon);
                ChartDataset {
                    point_id: p.id,
                    label: p.name.clone(),
                    data: series_at(position, labels.len()),
                    border_color: p.color.clone(),
                    background_color: p.color.clone(),
                    trend: request.calculate_trends.then(|| trend_at(position)),
                }
            })
            .collect();
        Ok(ChartData { labels, datasets })
    }

    async fn trend_analysis(
        &self,
        dataset: &str,
        position: LatLng,
        reference: Option<LatLng>,
    ) -> BowserResult<TrendResult> {
        self.record(
            Endpoint::Trend,
            Call::Trend {
                dataset: dataset.to_string(),
                position,
                reference,
            },
        )?;
        self.time_len(dataset)?;
        Ok(trend_at(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bowser_common::{PointId, PointPayload};

    fn request(n: usize) -> MultiPointRequest {
        MultiPointRequest {
            points: (0..n)
                .map(|i| PointPayload {
                    id: PointId(i as u64 + 1),
                    lat: 34.0,
                    lon: -118.0 + i as f64,
                    color: "#000".to_string(),
                    name: format!("Point {}", i + 1),
                })
                .collect(),
            dataset_name: "displacement".to_string(),
            ref_lon: None,
            ref_lat: None,
            calculate_trends: true,
        }
    }

    #[tokio::test]
    async fn test_multi_point_echoes_points() {
        let backend = ScriptedBackend::default();
        let chart = backend.multi_point(&request(2)).await.unwrap();
        assert_eq!(chart.labels.len(), 3);
        assert_eq!(chart.datasets.len(), 2);
        assert!(chart.datasets[0].trend.is_some());
        assert_eq!(backend.multi_point_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_endpoint() {
        let backend = ScriptedBackend::default();
        backend.fail(Endpoint::Datasets);
        assert!(backend.datasets().await.is_err());
        backend.recover(Endpoint::Datasets);
        assert_eq!(backend.datasets().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_held_request_waits_for_release() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.hold_multi_point(1);
        let task = {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move { backend.multi_point(&request(1)).await })
        };
        tokio::task::yield_now().await;
        assert!(!task.is_finished());
        backend.release_multi_point(1);
        assert!(task.await.unwrap().is_ok());
    }

    #[test]
    fn test_unknown_dataset_point_series() {
        let backend = ScriptedBackend::default();
        let result =
            tokio_test::block_on(backend.point_series("nope", LatLng::new(0.0, 0.0)));
        assert!(matches!(result, Err(BowserError::DatasetNotFound(_))));
    }
}
