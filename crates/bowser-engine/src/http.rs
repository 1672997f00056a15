//! HTTP backend for the Bowser tile and time series service.

use std::time::Duration;

use async_trait::async_trait;
use bowser_common::{
    BowserApi, BowserError, BowserResult, Catalog, ChartData, DataMode, LatLng, ModeResponse,
    MultiPointRequest, TileJson, TileRequest, TrendResult,
};
use reqwest::{Client, Request, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

/// [`BowserApi`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> BowserResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| BowserError::Config(format!("invalid base url '{}': {}", base_url, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| BowserError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Base url extended with percent-encoded path segments.
    fn segment_url(&self, segments: &[&str]) -> BowserResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BowserError::Config(format!("base url '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Url of the colorbar image for `colormap`. The image itself is not fetched.
    pub fn colorbar_url(&self, colormap: &str) -> String {
        self.url(&format!("/colorbar/{}", colormap))
    }

    pub fn datasets_request(&self) -> BowserResult<Request> {
        self.client
            .get(self.url("/datasets"))
            .build()
            .map_err(|e| BowserError::network("/datasets", e))
    }

    pub fn mode_request(&self) -> BowserResult<Request> {
        self.client
            .get(self.url("/mode"))
            .build()
            .map_err(|e| BowserError::network("/mode", e))
    }

    pub fn tile_json_request(&self, request: &TileRequest) -> BowserResult<Request> {
        self.client
            .get(self.url(request.path()))
            .query(&request.query_pairs())
            .build()
            .map_err(|e| BowserError::network(request.path(), e))
    }

    pub fn point_request(&self, dataset: &str, position: LatLng) -> BowserResult<Request> {
        self.client
            .get(self.url("/point"))
            .query(&[
                ("dataset_name", dataset.to_string()),
                ("lon", position.lng.to_string()),
                ("lat", position.lat.to_string()),
            ])
            .build()
            .map_err(|e| BowserError::network("/point", e))
    }

    pub fn multi_point_request(&self, body: &MultiPointRequest) -> BowserResult<Request> {
        self.client
            .post(self.url("/multi_point"))
            .json(body)
            .build()
            .map_err(|e| BowserError::network("/multi_point", e))
    }

    pub fn trend_request(
        &self,
        dataset: &str,
        position: LatLng,
        reference: Option<LatLng>,
    ) -> BowserResult<Request> {
        let mut query = vec![
            ("lon", position.lng.to_string()),
            ("lat", position.lat.to_string()),
        ];
        if let Some(reference) = reference {
            query.push(("ref_lon", reference.lng.to_string()));
            query.push(("ref_lat", reference.lat.to_string()));
        }
        let url = self.segment_url(&["trend_analysis", dataset])?;
        self.client
            .get(url)
            .query(&query)
            .build()
            .map_err(|e| BowserError::network("/trend_analysis", e))
    }

    async fn execute<T: DeserializeOwned>(&self, endpoint: &str, request: Request) -> BowserResult<T> {
        debug!(method = %request.method(), url = %request.url(), "Sending request");
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| BowserError::network(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BowserError::network(endpoint, format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BowserError::network(endpoint, e))?;
        serde_json::from_slice(&body).map_err(|e| BowserError::malformed(endpoint, e))
    }
}

#[async_trait]
impl BowserApi for HttpBackend {
    #[instrument(skip(self))]
    async fn datasets(&self) -> BowserResult<Catalog> {
        self.execute("/datasets", self.datasets_request()?).await
    }

    #[instrument(skip(self))]
    async fn mode(&self) -> BowserResult<DataMode> {
        let response: ModeResponse = self.execute("/mode", self.mode_request()?).await?;
        Ok(response.mode)
    }

    #[instrument(skip(self, request), fields(variable = %request.variable, time_idx = request.time_idx))]
    async fn tile_json(&self, request: &TileRequest) -> BowserResult<TileJson> {
        self.execute(request.path(), self.tile_json_request(request)?).await
    }

    #[instrument(skip(self))]
    async fn point_series(&self, dataset: &str, position: LatLng) -> BowserResult<Vec<Option<f64>>> {
        self.execute("/point", self.point_request(dataset, position)?)
            .await
    }

    #[instrument(skip(self, request), fields(dataset = %request.dataset_name, points = request.points.len()))]
    async fn multi_point(&self, request: &MultiPointRequest) -> BowserResult<ChartData> {
        self.execute("/multi_point", self.multi_point_request(request)?)
            .await
    }

    #[instrument(skip(self))]
    async fn trend_analysis(
        &self,
        dataset: &str,
        position: LatLng,
        reference: Option<LatLng>,
    ) -> BowserResult<TrendResult> {
        self.execute(
            "/trend_analysis",
            self.trend_request(dataset, position, reference)?,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bowser_common::{AlgorithmParams, PointId, PointPayload, TileEndpoint};

    fn backend() -> HttpBackend {
        HttpBackend::new("http://localhost:8000/", Duration::from_secs(5)).unwrap()
    }

    fn query(request: &Request) -> Vec<(String, String)> {
        request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = HttpBackend::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_tile_json_request_carries_query() {
        let tile = TileRequest {
            endpoint: TileEndpoint::Cog,
            variable: "disp".to_string(),
            time_idx: 2,
            rescale: (-1.0, 1.0),
            colormap_name: "rdbu_r".to_string(),
            algorithm: Some("shift".to_string()),
            algorithm_params: Some(AlgorithmParams { shift: 0.5 }),
            url: Some("s3://b/d2.tif".to_string()),
            mask: None,
            mask_min_value: None,
        };
        let req = backend().tile_json_request(&tile).unwrap();
        assert_eq!(req.url().path(), "/cog/WebMercatorQuad/tilejson.json");
        let q = query(&req);
        assert!(q.contains(&("algorithm_params".to_string(), r#"{"shift":0.5}"#.to_string())));
        assert!(q.contains(&("url".to_string(), "s3://b/d2.tif".to_string())));
        assert!(!q.iter().any(|(k, _)| k == "mask"));
    }

    #[test]
    fn test_point_request_uses_lon_lat() {
        let req = backend()
            .point_request("disp", LatLng::new(34.5, -118.25))
            .unwrap();
        assert_eq!(req.url().path(), "/point");
        let q = query(&req);
        assert_eq!(
            q,
            vec![
                ("dataset_name".to_string(), "disp".to_string()),
                ("lon".to_string(), "-118.25".to_string()),
                ("lat".to_string(), "34.5".to_string()),
            ]
        );
    }

    #[test]
    fn test_trend_request_reference_is_optional() {
        let b = backend();
        let without = b
            .trend_request("disp", LatLng::new(1.0, 2.0), None)
            .unwrap();
        assert_eq!(without.url().path(), "/trend_analysis/disp");
        assert_eq!(query(&without).len(), 2);
        let with = b
            .trend_request("disp", LatLng::new(1.0, 2.0), Some(LatLng::new(3.0, 4.0)))
            .unwrap();
        assert!(query(&with).contains(&("ref_lat".to_string(), "3".to_string())));
    }

    #[test]
    fn test_trend_request_escapes_dataset_name() {
        let b = backend();
        let position = LatLng::new(1.0, 2.0);

        let req = b.trend_request("ifg/unwrapped", position, None).unwrap();
        assert_eq!(req.url().path(), "/trend_analysis/ifg%2Funwrapped");

        let req = b.trend_request("disp#1", position, None).unwrap();
        assert_eq!(req.url().path(), "/trend_analysis/disp%231");
        assert!(req.url().fragment().is_none());

        let req = b.trend_request("a?b", position, None).unwrap();
        assert_eq!(req.url().path(), "/trend_analysis/a%3Fb");
        assert_eq!(query(&req).len(), 2);
    }

    #[test]
    fn test_trend_request_keeps_base_path() {
        let b = HttpBackend::new("http://localhost:8000/bowser/", Duration::from_secs(5)).unwrap();
        let req = b.trend_request("disp", LatLng::new(1.0, 2.0), None).unwrap();
        assert_eq!(req.url().path(), "/bowser/trend_analysis/disp");
    }

    #[test]
    fn test_multi_point_is_json_post() {
        let body = MultiPointRequest {
            points: vec![PointPayload {
                id: PointId(3),
                lat: 1.0,
                lon: 2.0,
                color: "#1f77b4".to_string(),
                name: "Point 3".to_string(),
            }],
            dataset_name: "disp".to_string(),
            ref_lon: None,
            ref_lat: None,
            calculate_trends: false,
        };
        let req = backend().multi_point_request(&body).unwrap();
        assert_eq!(req.method(), reqwest::Method::POST);
        let sent: serde_json::Value =
            serde_json::from_slice(req.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(sent["dataset_name"], "disp");
        assert_eq!(sent["points"][0]["id"], 3);
    }

    #[test]
    fn test_colorbar_url() {
        assert_eq!(
            backend().colorbar_url("viridis"),
            "http://localhost:8000/colorbar/viridis"
        );
    }
}
