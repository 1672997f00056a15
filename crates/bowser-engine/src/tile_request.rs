//! Tile request derivation.
//!
//! Turns the display settings for one dataset into a [`TileRequest`]. Building
//! never fails: a shift dataset without a usable reference value degrades to
//! a plain request without `algorithm`.

use bowser_common::{
    AlgorithmParams, BowserError, BowserResult, ColorScaleConfig, DataMode, RasterGroup,
    TileEndpoint, TileJson, TileRequest,
};
use tracing::{debug, warn};

use crate::metrics;
use crate::sequence::{Flow, RequestSequence};
use crate::state::{Action, AppState};

/// Inputs for one tile request.
#[derive(Debug, Clone, Copy)]
pub struct TileRequestBuilder<'a> {
    group: &'a RasterGroup,
    time_index: i64,
    color_scale: &'a ColorScaleConfig,
    mode: DataMode,
    ref_values: Option<&'a [Option<f64>]>,
}

impl<'a> TileRequestBuilder<'a> {
    pub fn new(group: &'a RasterGroup, color_scale: &'a ColorScaleConfig) -> Self {
        Self {
            group,
            time_index: 0,
            color_scale,
            mode: DataMode::default(),
            ref_values: None,
        }
    }

    /// Builder for the active dataset, or `None` when no dataset is active.
    pub fn from_state(state: &'a AppState) -> Option<Self> {
        let group = state.current_group()?;
        Some(
            Self::new(group, &state.color_scale)
                .time_index(state.time_index)
                .mode(state.data_mode)
                .ref_values(state.ref_values_for(&group.name)),
        )
    }

    pub fn time_index(mut self, index: i64) -> Self {
        self.time_index = index;
        self
    }

    pub fn mode(mut self, mode: DataMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn ref_values(mut self, values: Option<&'a [Option<f64>]>) -> Self {
        self.ref_values = values;
        self
    }

    pub fn build(&self) -> TileRequest {
        let group = self.group;
        let idx = group.clamp_time_index(self.time_index);

        let mut algorithm = group.algorithm.clone();
        let mut algorithm_params = None;
        if group.is_shift() {
            match self.shift_at(idx) {
                Ok(shift) => algorithm_params = Some(AlgorithmParams { shift }),
                Err(e) => {
                    debug!(error = %e, "Requesting tiles without shift");
                    algorithm = None;
                }
            }
        }

        let (url, mask, mask_min_value) = match self.mode {
            DataMode::Cog => (
                group.file_at(idx).map(str::to_string),
                group.mask_at(idx).map(str::to_string),
                group.mask_min_value,
            ),
            DataMode::Multidim => (None, None, None),
        };

        TileRequest {
            endpoint: TileEndpoint::for_mode(self.mode),
            variable: group.name.clone(),
            time_idx: idx,
            rescale: (self.color_scale.vmin, self.color_scale.vmax),
            colormap_name: self.color_scale.colormap_name.clone(),
            algorithm,
            algorithm_params,
            url,
            mask,
            mask_min_value,
        }
    }

    /// Reference shift at `idx`. Null and non-finite entries count as missing.
    fn shift_at(&self, idx: usize) -> Result<f64, BowserError> {
        self.ref_values
            .and_then(|values| values.get(idx).copied().flatten())
            .filter(|v| v.is_finite())
            .ok_or_else(|| BowserError::MissingReferenceData {
                dataset: self.group.name.clone(),
                time_idx: idx,
            })
    }
}

/// Drives the tilejson flow: decides when the active layer needs a new
/// tilejson request and which responses may update the tile url.
#[derive(Debug, Default)]
pub struct TileFetcher {
    sequence: RequestSequence,
    last: Option<TileRequest>,
}

impl TileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a sequenced request when the derived request differs from the
    /// last one issued.
    pub fn plan(&mut self, state: &AppState) -> Option<(u64, TileRequest)> {
        let request = TileRequestBuilder::from_state(state)?.build();
        if self.last.as_ref() == Some(&request) {
            return None;
        }
        self.last = Some(request.clone());
        let seq = self.sequence.issue();
        metrics::record_request(Flow::Tile);
        debug!(seq = seq, variable = %request.variable, time_idx = request.time_idx, "Requesting tilejson");
        Some((seq, request))
    }

    pub fn accept(&mut self, seq: u64, result: BowserResult<TileJson>) -> Option<Action> {
        if !self.sequence.is_latest(seq) {
            metrics::record_stale_response(Flow::Tile);
            debug!(seq = seq, latest = self.sequence.latest(), "Dropping stale tilejson response");
            return None;
        }
        match result {
            Ok(tilejson) => match tilejson.url_template() {
                Some(url) => Some(Action::SetTileUrl {
                    url: Some(url.to_string()),
                }),
                None => {
                    warn!(seq = seq, "Tilejson response has no tile urls");
                    None
                }
            },
            Err(e) => {
                metrics::record_failure(Flow::Tile);
                warn!(seq = seq, error = %e, "Tilejson request failed, keeping previous layer");
                None
            }
        }
    }
}
