//! Multi-point time series aggregation for the chart panel.
//!
//! All visible points are fetched against the active dataset in one batched
//! request. Every request (and every clear) advances the flow's sequence, so
//! only the newest response can reach the chart.

use bowser_common::{BowserResult, ChartData, ChartStatus, LatLng, MultiPointRequest, PointPayload};
use tracing::{debug, info, warn};

use crate::metrics;
use crate::sequence::{Flow, RequestSequence};
use crate::state::{Action, AppState};

/// What the aggregator wants done after a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregatorPlan {
    /// Drop chart data and show `status`; nothing is requested.
    Clear(ChartStatus),
    /// Issue `request` tagged with `seq`.
    Fetch { seq: u64, request: MultiPointRequest },
}

/// The slice of state the chart depends on.
#[derive(Debug, Clone, PartialEq)]
struct ChartInputs {
    visible: bool,
    dataset: Option<String>,
    points: Vec<PointPayload>,
    reference: Option<LatLng>,
    trends: bool,
}

impl ChartInputs {
    fn from_state(state: &AppState) -> Self {
        Self {
            visible: state.chart_visible,
            dataset: state.current_dataset.clone(),
            points: state.points.visible_payloads(),
            reference: state
                .reference_marker
                .filter(|_| state.needs_reference()),
            trends: state.show_trends,
        }
    }
}

#[derive(Debug, Default)]
pub struct TimeSeriesAggregator {
    sequence: RequestSequence,
    last: Option<ChartInputs>,
}

impl TimeSeriesAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide what the chart needs given `state`. Returns `None` when nothing
    /// the chart depends on changed since the last plan.
    pub fn plan(&mut self, state: &AppState) -> Option<AggregatorPlan> {
        let inputs = ChartInputs::from_state(state);
        if self.last.as_ref() == Some(&inputs) {
            return None;
        }
        self.last = Some(inputs.clone());

        // Clearing also invalidates whatever is in flight.
        let seq = self.sequence.issue();
        if !inputs.visible {
            return Some(AggregatorPlan::Clear(ChartStatus::Hidden));
        }
        let Some(dataset_name) = inputs.dataset else {
            return Some(AggregatorPlan::Clear(ChartStatus::NoPoints));
        };
        if inputs.points.is_empty() {
            return Some(AggregatorPlan::Clear(ChartStatus::NoPoints));
        }

        let request = MultiPointRequest {
            points: inputs.points,
            dataset_name,
            ref_lon: inputs.reference.map(|r| r.lng),
            ref_lat: inputs.reference.map(|r| r.lat),
            calculate_trends: inputs.trends,
        };
        metrics::record_request(Flow::Aggregator);
        debug!(
            seq = seq,
            dataset = %request.dataset_name,
            points = request.points.len(),
            trends = request.calculate_trends,
            "Requesting multi-point series"
        );
        Some(AggregatorPlan::Fetch { seq, request })
    }

    /// Turn a response into the actions to apply, in order. Stale responses
    /// produce nothing.
    pub fn accept(
        &mut self,
        seq: u64,
        request: &MultiPointRequest,
        result: BowserResult<ChartData>,
    ) -> Vec<Action> {
        if !self.sequence.is_latest(seq) {
            metrics::record_stale_response(Flow::Aggregator);
            debug!(seq = seq, latest = self.sequence.latest(), "Dropping stale chart response");
            return Vec::new();
        }

        let chart = match result {
            Ok(chart) => chart,
            Err(e) => {
                metrics::record_failure(Flow::Aggregator);
                warn!(seq = seq, error = %e, "Multi-point request failed, keeping previous chart");
                return vec![Action::SetChartStatus {
                    status: ChartStatus::FetchFailed,
                }];
            }
        };

        let dataset = &request.dataset_name;
        let mut actions = Vec::with_capacity(1 + 2 * chart.datasets.len());
        for series in &chart.datasets {
            actions.push(Action::SetPointSeries {
                id: series.point_id,
                dataset: dataset.clone(),
                values: series.data.clone(),
            });
        }
        if request.calculate_trends {
            for series in &chart.datasets {
                if let Some(trend) = series.trend {
                    actions.push(Action::SetPointTrend {
                        id: series.point_id,
                        dataset: dataset.clone(),
                        trend,
                    });
                }
            }
        }

        let status = if chart.is_empty() {
            ChartStatus::Empty
        } else {
            ChartStatus::Ready
        };
        info!(seq = seq, series = chart.datasets.len(), "Chart updated");
        actions.insert(
            0,
            Action::SetChart {
                data: Some(chart),
                status,
            },
        );
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bowser_common::{BowserError, ChartDataset, PointId, RasterGroup, TrendResult, XValue};
    use std::sync::Arc;

    fn state(uses_spatial_ref: bool) -> AppState {
        let group = RasterGroup {
            name: "disp".to_string(),
            file_list: vec![],
            mask_file_list: vec![],
            mask_min_value: None,
            nodata: None,
            uses_spatial_ref,
            algorithm: None,
            latlon_bounds: None,
            x_values: (0..2).map(XValue::Index).collect(),
        };
        let mut state = AppState::default();
        state.catalog = Arc::new([("disp".to_string(), group)].into_iter().collect());
        state.current_dataset = Some("disp".to_string());
        state.chart_visible = true;
        state.reference_marker = Some(LatLng::new(1.0, 2.0));
        state
    }

    fn chart_for(request: &MultiPointRequest, trend: Option<TrendResult>) -> ChartData {
        ChartData {
            labels: vec![XValue::Index(0), XValue::Index(1)],
            datasets: request
                .points
                .iter()
                .map(|p| ChartDataset {
                    point_id: p.id,
                    label: p.name.clone(),
                    data: vec![Some(0.0), Some(1.0)],
                    border_color: p.color.clone(),
                    background_color: p.color.clone(),
                    trend,
                })
                .collect(),
        }
    }

    fn fetch(plan: Option<AggregatorPlan>) -> (u64, MultiPointRequest) {
        match plan {
            Some(AggregatorPlan::Fetch { seq, request }) => (seq, request),
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    #[test]
    fn test_hidden_chart_clears_without_request() {
        let mut s = state(false);
        s.chart_visible = false;
        s.points.add(LatLng::new(0.0, 0.0), None);
        let mut agg = TimeSeriesAggregator::new();
        assert_eq!(agg.plan(&s), Some(AggregatorPlan::Clear(ChartStatus::Hidden)));
    }

    #[test]
    fn test_no_visible_points_clears() {
        let mut s = state(false);
        let id = s.points.add(LatLng::new(0.0, 0.0), None);
        s.points.toggle_visibility(id);
        let mut agg = TimeSeriesAggregator::new();
        assert_eq!(agg.plan(&s), Some(AggregatorPlan::Clear(ChartStatus::NoPoints)));
    }

    #[test]
    fn test_reference_only_sent_for_spatial_ref_datasets() {
        let mut s = state(true);
        s.points.add(LatLng::new(0.0, 0.0), None);
        let (_, request) = fetch(TimeSeriesAggregator::new().plan(&s));
        assert_eq!(request.ref_lon, Some(2.0));
        assert_eq!(request.ref_lat, Some(1.0));

        let mut s = state(false);
        s.points.add(LatLng::new(0.0, 0.0), None);
        let (_, request) = fetch(TimeSeriesAggregator::new().plan(&s));
        assert!(request.ref_lon.is_none());
    }

    #[test]
    fn test_unrelated_changes_do_not_refetch() {
        let mut s = state(false);
        s.points.add(LatLng::new(0.0, 0.0), None);
        let mut agg = TimeSeriesAggregator::new();
        fetch(agg.plan(&s));
        s.time_index = 1;
        s.color_scale.vmax = 3.0;
        assert!(agg.plan(&s).is_none());
        // Reference moves only matter when the dataset uses one.
        s.reference_marker = Some(LatLng::new(5.0, 5.0));
        assert!(agg.plan(&s).is_none());
    }

    #[test]
    fn test_out_of_order_response_is_discarded() {
        let mut s = state(false);
        s.points.add(LatLng::new(0.0, 0.0), None);
        let mut agg = TimeSeriesAggregator::new();
        let (seq1, req1) = fetch(agg.plan(&s));
        s.points.add(LatLng::new(1.0, 1.0), None);
        let (seq2, req2) = fetch(agg.plan(&s));

        let fresh = agg.accept(seq2, &req2, Ok(chart_for(&req2, None)));
        assert!(matches!(&fresh[0], Action::SetChart { data: Some(d), .. } if d.datasets.len() == 2));
        assert!(agg.accept(seq1, &req1, Ok(chart_for(&req1, None))).is_empty());
    }

    #[test]
    fn test_clear_invalidates_in_flight_request() {
        let mut s = state(false);
        s.points.add(LatLng::new(0.0, 0.0), None);
        let mut agg = TimeSeriesAggregator::new();
        let (seq, req) = fetch(agg.plan(&s));
        s.chart_visible = false;
        assert_eq!(agg.plan(&s), Some(AggregatorPlan::Clear(ChartStatus::Hidden)));
        assert!(agg.accept(seq, &req, Ok(chart_for(&req, None))).is_empty());
    }

    #[test]
    fn test_trends_become_follow_up_actions() {
        let mut s = state(false);
        s.show_trends = true;
        s.points.add(LatLng::new(0.0, 0.0), None);
        let mut agg = TimeSeriesAggregator::new();
        let (seq, req) = fetch(agg.plan(&s));
        let trend = TrendResult {
            slope: 1.0,
            intercept: 0.0,
            r_squared: 1.0,
            rate_per_year: 365.25,
        };
        let actions = agg.accept(seq, &req, Ok(chart_for(&req, Some(trend))));
        assert_eq!(actions.len(), 3);
        assert!(matches!(actions[0], Action::SetChart { status: ChartStatus::Ready, .. }));
        assert_eq!(
            actions[2],
            Action::SetPointTrend {
                id: PointId(1),
                dataset: "disp".to_string(),
                trend
            }
        );
    }

    #[test]
    fn test_empty_and_failed_statuses() {
        let mut s = state(false);
        s.points.add(LatLng::new(0.0, 0.0), None);
        let mut agg = TimeSeriesAggregator::new();
        let (seq, req) = fetch(agg.plan(&s));
        let actions = agg.accept(seq, &req, Ok(ChartData::default()));
        assert!(matches!(actions[0], Action::SetChart { status: ChartStatus::Empty, .. }));

        s.points.add(LatLng::new(1.0, 0.0), None);
        let (seq, req) = fetch(agg.plan(&s));
        let actions = agg.accept(seq, &req, Err(BowserError::network("/multi_point", "503")));
        assert_eq!(
            actions,
            vec![Action::SetChartStatus {
                status: ChartStatus::FetchFailed
            }]
        );
    }
}
