//! Multi-point time series request/response types.

use serde::{Deserialize, Serialize};

use crate::point::{PointId, TrendResult};
use crate::time::XValue;

/// One point in a batched `/multi_point` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub id: PointId,
    pub lat: f64,
    pub lon: f64,
    pub color: String,
    pub name: String,
}

/// Body of `POST /multi_point`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPointRequest {
    pub points: Vec<PointPayload>,
    pub dataset_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_lat: Option<f64>,
    pub calculate_trends: bool,
}

/// Chart-ready series for one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub point_id: PointId,
    pub label: String,
    /// One value per time index; `null` where the raster has no data.
    pub data: Vec<Option<f64>>,
    #[serde(default)]
    pub border_color: String,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub trend: Option<TrendResult>,
}

/// Response of `POST /multi_point`, handed to the chart renderer as-is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub labels: Vec<XValue>,
    #[serde(default)]
    pub datasets: Vec<ChartDataset>,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn dataset_for(&self, id: PointId) -> Option<&ChartDataset> {
        self.datasets.iter().find(|d| d.point_id == id)
    }
}

/// What the chart panel should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartStatus {
    /// Chart panel closed; no requests are issued.
    #[default]
    Hidden,
    NoPoints,
    Loading,
    Ready,
    /// The service answered but returned no series.
    Empty,
    /// Last fetch failed; previous chart data is kept.
    FetchFailed,
}

impl ChartStatus {
    /// Text for the chart placeholder, if the status warrants one.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            ChartStatus::NoPoints => Some("No points selected"),
            ChartStatus::FetchFailed => Some("Failed to load time series"),
            ChartStatus::Empty => Some("No data for the selected points"),
            ChartStatus::Hidden | ChartStatus::Loading | ChartStatus::Ready => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_absent_reference() {
        let req = MultiPointRequest {
            points: vec![PointPayload {
                id: PointId(1),
                lat: 34.0,
                lon: -118.0,
                color: "#1f77b4".to_string(),
                name: "Point 1".to_string(),
            }],
            dataset_name: "disp".to_string(),
            ref_lon: None,
            ref_lat: None,
            calculate_trends: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("ref_lon").is_none());
        assert_eq!(json["calculate_trends"], true);
        assert_eq!(json["points"][0]["id"], 1);
    }

    #[test]
    fn test_response_parses_nulls_and_trend() {
        let body = r##"{
            "labels": ["20200101", "20200113"],
            "datasets": [{
                "pointId": 7,
                "label": "Point 7",
                "data": [0.0, null],
                "borderColor": "#1f77b4",
                "backgroundColor": "#1f77b4",
                "trend": {"slope": 0.1, "intercept": 0.0, "r_squared": 1.0, "mm_per_year": 36.5}
            }]
        }"##;
        let chart: ChartData = serde_json::from_str(body).unwrap();
        let ds = chart.dataset_for(PointId(7)).unwrap();
        assert_eq!(ds.data, vec![Some(0.0), None]);
        assert_eq!(ds.trend.unwrap().rate_per_year, 36.5);
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(ChartStatus::NoPoints.message(), Some("No points selected"));
        assert!(ChartStatus::Ready.message().is_none());
    }
}
