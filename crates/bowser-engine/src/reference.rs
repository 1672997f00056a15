//! Reference shift resolution.
//!
//! Datasets that use a spatial reference are displayed relative to the value
//! under the reference marker. The series at the marker is fetched once per
//! dataset and cached in state; moving the marker refreshes only the active
//! dataset's entry. A failed refresh drops that entry so tiles and charts never
//! disagree on the reference.

use bowser_common::{BowserResult, LatLng};
use tracing::{debug, info, warn};

use crate::metrics;
use crate::sequence::{Flow, RequestSequence};
use crate::state::{Action, AppState};

/// A `/point` request for the reference series of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRequest {
    pub seq: u64,
    pub dataset: String,
    pub position: LatLng,
}

#[derive(Debug, Default)]
pub struct ReferenceShiftResolver {
    sequence: RequestSequence,
    last_marker: Option<LatLng>,
    last_dataset: Option<String>,
}

impl ReferenceShiftResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `state` needs a reference series fetched.
    ///
    /// Fetches when the marker moved while the active dataset uses a spatial
    /// reference, or when the active dataset changed to one with nothing
    /// cached.
    pub fn plan(&mut self, state: &AppState) -> Option<ReferenceRequest> {
        let marker_moved = state.reference_marker != self.last_marker;
        let dataset_changed = state.current_dataset != self.last_dataset;
        self.last_marker = state.reference_marker;
        self.last_dataset = state.current_dataset.clone();

        let group = state.current_group().filter(|g| g.uses_spatial_ref)?;
        let position = state.reference_marker?;
        let cached = state.ref_values.contains_key(&group.name);
        if !marker_moved && (cached || !dataset_changed) {
            return None;
        }

        let seq = self.sequence.issue();
        metrics::record_request(Flow::Reference);
        debug!(seq = seq, dataset = %group.name, lat = position.lat, lng = position.lng, "Resolving reference series");
        Some(ReferenceRequest {
            seq,
            dataset: group.name.clone(),
            position,
        })
    }

    /// Turn a `/point` response into a cache update. Stale responses produce
    /// nothing; a failure clears the dataset's entry.
    pub fn accept(
        &mut self,
        request: &ReferenceRequest,
        result: BowserResult<Vec<Option<f64>>>,
    ) -> Option<Action> {
        if !self.sequence.is_latest(request.seq) {
            metrics::record_stale_response(Flow::Reference);
            debug!(seq = request.seq, dataset = %request.dataset, "Dropping stale reference series");
            return None;
        }
        match result {
            Ok(values) => {
                info!(dataset = %request.dataset, len = values.len(), "Cached reference series");
                Some(Action::SetRefValues {
                    dataset: request.dataset.clone(),
                    values,
                })
            }
            Err(e) => {
                metrics::record_failure(Flow::Reference);
                warn!(dataset = %request.dataset, error = %e, "Reference series request failed, clearing cached series");
                Some(Action::ClearRefValues {
                    dataset: request.dataset.clone(),
                })
            }
        }
    }
}
