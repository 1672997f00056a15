//! Central application state and its reducer.
//!
//! State is only changed through [`StateStore::dispatch`]. The reducer is pure
//! and total: an action that changes nothing (including unknown action types)
//! hands back the same `Arc`, so consumers can detect changes with
//! [`Arc::ptr_eq`].

use std::collections::BTreeMap;
use std::sync::Arc;

use bowser_common::{
    Catalog, ChartData, ChartStatus, ColorScaleConfig, DataMode, LatLng, PointId, RasterGroup,
    TrendResult,
};
use serde::{Deserialize, Serialize};

use crate::points::{PointRegistry, PointUpdate};

/// Chart panel contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartState {
    pub data: Option<ChartData>,
    pub status: ChartStatus,
}

/// Everything the UI renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub data_mode: DataMode,
    pub current_dataset: Option<String>,
    /// Requested time index. Not clamped here; consumers clamp against the
    /// active dataset's time axis.
    pub time_index: i64,
    pub points: PointRegistry,
    pub reference_marker: Option<LatLng>,
    /// Reference shift series per dataset, aligned to that dataset's time axis.
    pub ref_values: BTreeMap<String, Arc<Vec<Option<f64>>>>,
    pub color_scale: ColorScaleConfig,
    pub basemap: String,
    pub chart_visible: bool,
    pub show_trends: bool,
    pub chart: ChartState,
    /// Tile url template for the current layer, as handed to the renderer.
    pub tile_url: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_palette(Vec::new())
    }
}

impl AppState {
    pub fn with_palette(palette: Vec<String>) -> Self {
        Self {
            catalog: Arc::new(Catalog::new()),
            data_mode: DataMode::default(),
            current_dataset: None,
            time_index: 0,
            points: PointRegistry::new(palette),
            reference_marker: None,
            ref_values: BTreeMap::new(),
            color_scale: ColorScaleConfig::default(),
            basemap: "satellite".to_string(),
            chart_visible: false,
            show_trends: false,
            chart: ChartState::default(),
            tile_url: None,
        }
    }

    /// Metadata of the active dataset, if any.
    pub fn current_group(&self) -> Option<&RasterGroup> {
        self.current_dataset
            .as_deref()
            .and_then(|name| self.catalog.get(name))
    }

    /// The active dataset is shown relative to the reference marker.
    pub fn needs_reference(&self) -> bool {
        self.current_group().is_some_and(|g| g.uses_spatial_ref)
    }

    pub fn ref_values_for(&self, dataset: &str) -> Option<&[Option<f64>]> {
        self.ref_values.get(dataset).map(|v| v.as_slice())
    }

    /// Time index clamped against the active dataset.
    pub fn clamped_time_index(&self) -> Option<usize> {
        self.current_group()
            .map(|g| g.clamp_time_index(self.time_index))
    }
}

/// Every state transition the application supports.
///
/// Actions can be decoded from JSON (`{"type": "add_point", ...}`); any
/// unrecognized `type` decodes to [`Action::Unknown`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    SetCatalog { datasets: Catalog },
    SetDataMode { mode: DataMode },
    SetCurrentDataset { name: String },
    SetTimeIndex { index: i64 },

    AddPoint {
        position: LatLng,
        #[serde(default)]
        name: Option<String>,
    },
    RemovePoint { id: PointId },
    UpdatePoint { id: PointId, update: PointUpdate },
    ClearPoints,
    TogglePointVisibility { id: PointId },
    SetSelectedPoint { id: Option<PointId> },
    /// Legacy single-marker shape; translated before reduction.
    SetMarkerPosition { position: LatLng },

    SetReferenceMarker { position: LatLng },
    SetRefValues { dataset: String, values: Vec<Option<f64>> },
    /// Forget the cached reference series of `dataset`.
    ClearRefValues { dataset: String },

    SetColormap { name: String },
    SetVmin { value: f64 },
    SetVmax { value: f64 },
    SetOpacity { value: f64 },
    SetBasemap { name: String },

    ToggleChart,
    ToggleTrends,
    SetChart { data: Option<ChartData>, status: ChartStatus },
    SetChartStatus { status: ChartStatus },
    SetPointSeries { id: PointId, dataset: String, values: Vec<Option<f64>> },
    SetPointTrend { id: PointId, dataset: String, trend: TrendResult },
    SetTileUrl { url: Option<String> },

    #[serde(other)]
    Unknown,
}

impl Action {
    /// Decode an action from its JSON form.
    pub fn from_json(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::SetCatalog { .. } => "set_catalog",
            Action::SetDataMode { .. } => "set_data_mode",
            Action::SetCurrentDataset { .. } => "set_current_dataset",
            Action::SetTimeIndex { .. } => "set_time_index",
            Action::AddPoint { .. } => "add_point",
            Action::RemovePoint { .. } => "remove_point",
            Action::UpdatePoint { .. } => "update_point",
            Action::ClearPoints => "clear_points",
            Action::TogglePointVisibility { .. } => "toggle_point_visibility",
            Action::SetSelectedPoint { .. } => "set_selected_point",
            Action::SetMarkerPosition { .. } => "set_marker_position",
            Action::SetReferenceMarker { .. } => "set_reference_marker",
            Action::SetRefValues { .. } => "set_ref_values",
            Action::ClearRefValues { .. } => "clear_ref_values",
            Action::SetColormap { .. } => "set_colormap",
            Action::SetVmin { .. } => "set_vmin",
            Action::SetVmax { .. } => "set_vmax",
            Action::SetOpacity { .. } => "set_opacity",
            Action::SetBasemap { .. } => "set_basemap",
            Action::ToggleChart => "toggle_chart",
            Action::ToggleTrends => "toggle_trends",
            Action::SetChart { .. } => "set_chart",
            Action::SetChartStatus { .. } => "set_chart_status",
            Action::SetPointSeries { .. } => "set_point_series",
            Action::SetPointTrend { .. } => "set_point_trend",
            Action::SetTileUrl { .. } => "set_tile_url",
            Action::Unknown => "unknown",
        }
    }
}

/// Translate the legacy single-marker action into the point-collection model:
/// move the selected point if there is one, otherwise create a point.
pub fn translate_legacy(state: &AppState, action: Action) -> Action {
    match action {
        Action::SetMarkerPosition { position } => match state.points.selected() {
            Some(id) => Action::UpdatePoint {
                id,
                update: PointUpdate {
                    position: Some(position),
                    ..Default::default()
                },
            },
            None => Action::AddPoint {
                position,
                name: None,
            },
        },
        other => other,
    }
}

/// Apply `action` to `state`. Returns the same `Arc` when nothing changed.
pub fn reduce(state: &Arc<AppState>, action: &Action) -> Arc<AppState> {
    match action {
        Action::Unknown => Arc::clone(state),
        Action::SetMarkerPosition { .. } => {
            let translated = translate_legacy(state, action.clone());
            reduce(state, &translated)
        }
        _ => modify(state, |s| apply(s, action)),
    }
}

fn modify(state: &Arc<AppState>, f: impl FnOnce(&mut AppState) -> bool) -> Arc<AppState> {
    let mut next = AppState::clone(state);
    if f(&mut next) {
        Arc::new(next)
    } else {
        Arc::clone(state)
    }
}

fn set<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

fn apply(s: &mut AppState, action: &Action) -> bool {
    match action {
        Action::SetCatalog { datasets } => {
            if *s.catalog == *datasets {
                return false;
            }
            s.catalog = Arc::new(datasets.clone());
            let current_valid = s
                .current_dataset
                .as_ref()
                .is_some_and(|name| s.catalog.contains_key(name));
            if !current_valid {
                s.current_dataset = s.catalog.keys().next().cloned();
            }
            true
        }
        Action::SetDataMode { mode } => set(&mut s.data_mode, *mode),
        Action::SetCurrentDataset { name } => {
            if !s.catalog.contains_key(name) {
                return false;
            }
            set(&mut s.current_dataset, Some(name.clone()))
        }
        Action::SetTimeIndex { index } => set(&mut s.time_index, *index),

        Action::AddPoint { position, name } => {
            s.points.add(*position, name.clone());
            true
        }
        Action::RemovePoint { id } => s.points.remove(*id),
        Action::UpdatePoint { id, update } => s.points.update(*id, update),
        Action::ClearPoints => s.points.clear(),
        Action::TogglePointVisibility { id } => s.points.toggle_visibility(*id),
        Action::SetSelectedPoint { id } => s.points.select(*id),

        Action::SetReferenceMarker { position } => set(&mut s.reference_marker, Some(*position)),
        Action::SetRefValues { dataset, values } => {
            if s.ref_values_for(dataset) == Some(values.as_slice()) {
                return false;
            }
            s.ref_values
                .insert(dataset.clone(), Arc::new(values.clone()));
            true
        }
        Action::ClearRefValues { dataset } => s.ref_values.remove(dataset).is_some(),

        Action::SetColormap { name } => set(&mut s.color_scale.colormap_name, name.clone()),
        Action::SetVmin { value } => set_f64(&mut s.color_scale.vmin, *value),
        Action::SetVmax { value } => set_f64(&mut s.color_scale.vmax, *value),
        Action::SetOpacity { value } => set_f64(&mut s.color_scale.opacity, value.clamp(0.0, 1.0)),
        Action::SetBasemap { name } => set(&mut s.basemap, name.clone()),

        Action::ToggleChart => {
            s.chart_visible = !s.chart_visible;
            true
        }
        Action::ToggleTrends => {
            s.show_trends = !s.show_trends;
            true
        }
        Action::SetChart { data, status } => {
            let next = ChartState {
                data: data.clone(),
                status: *status,
            };
            set(&mut s.chart, next)
        }
        Action::SetChartStatus { status } => set(&mut s.chart.status, *status),
        Action::SetPointSeries {
            id,
            dataset,
            values,
        } => s.points.set_series(*id, dataset, values.clone()),
        Action::SetPointTrend { id, dataset, trend } => s.points.set_trend(*id, dataset, *trend),
        Action::SetTileUrl { url } => set(&mut s.tile_url, url.clone()),

        Action::SetMarkerPosition { .. } | Action::Unknown => false,
    }
}

/// Float setter that treats `-0.0` and `0.0` as different values, so a sign
/// change is a real state change. NaN is rejected.
fn set_f64(slot: &mut f64, value: f64) -> bool {
    if value.is_nan() || slot.to_bits() == value.to_bits() {
        return false;
    }
    *slot = value;
    true
}

/// Owner of the current state. One per session; never global.
#[derive(Debug, Clone)]
pub struct StateStore {
    state: Arc<AppState>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

impl StateStore {
    pub fn new(initial: AppState) -> Self {
        Self {
            state: Arc::new(initial),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Reduce `action` into the store and return the resulting state.
    pub fn dispatch(&mut self, action: &Action) -> Arc<AppState> {
        self.state = reduce(&self.state, action);
        Arc::clone(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bowser_common::XValue;

    fn group(name: &str) -> RasterGroup {
        RasterGroup {
            name: name.to_string(),
            file_list: vec!["a.tif".into(), "b.tif".into()],
            mask_file_list: vec![],
            mask_min_value: None,
            nodata: None,
            uses_spatial_ref: name == "disp",
            algorithm: (name == "disp").then(|| "shift".to_string()),
            latlon_bounds: None,
            x_values: vec![XValue::Index(0), XValue::Index(1)],
        }
    }

    fn catalog() -> Catalog {
        ["amp", "disp"]
            .into_iter()
            .map(|n| (n.to_string(), group(n)))
            .collect()
    }

    fn loaded_store() -> StateStore {
        let mut store = StateStore::default();
        store.dispatch(&Action::SetCatalog {
            datasets: catalog(),
        });
        store
    }

    #[test]
    fn test_unknown_action_returns_identical_state() {
        let mut store = loaded_store();
        let before = Arc::clone(store.state());
        let after = store.dispatch(&Action::Unknown);
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_unknown_json_type_decodes_to_unknown() {
        let action = Action::from_json(serde_json::json!({"type": "launch_rocket", "x": 1})).unwrap();
        assert_eq!(action, Action::Unknown);
    }

    #[test]
    fn test_known_json_action_decodes() {
        let action = Action::from_json(serde_json::json!({
            "type": "add_point",
            "position": {"lat": 1.0, "lng": 2.0}
        }))
        .unwrap();
        assert_eq!(
            action,
            Action::AddPoint {
                position: LatLng::new(1.0, 2.0),
                name: None
            }
        );
    }

    #[test]
    fn test_noop_actions_keep_identity() {
        let mut store = loaded_store();
        let before = Arc::clone(store.state());
        let after = store.dispatch(&Action::RemovePoint { id: PointId(77) });
        assert!(Arc::ptr_eq(&before, &after));
        let after = store.dispatch(&Action::SetTimeIndex { index: 0 });
        assert!(Arc::ptr_eq(&before, &after));
        let after = store.dispatch(&Action::ClearRefValues {
            dataset: "disp".to_string(),
        });
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_clear_ref_values_drops_one_dataset() {
        let mut store = loaded_store();
        for dataset in ["amp", "disp"] {
            store.dispatch(&Action::SetRefValues {
                dataset: dataset.to_string(),
                values: vec![Some(1.0)],
            });
        }
        let state = store.dispatch(&Action::ClearRefValues {
            dataset: "disp".to_string(),
        });
        assert!(state.ref_values_for("disp").is_none());
        assert_eq!(state.ref_values_for("amp"), Some(&[Some(1.0)][..]));
    }

    #[test]
    fn test_catalog_selects_first_dataset() {
        let store = loaded_store();
        assert_eq!(store.state().current_dataset.as_deref(), Some("amp"));
    }

    #[test]
    fn test_set_current_dataset_requires_known_name() {
        let mut store = loaded_store();
        store.dispatch(&Action::SetCurrentDataset {
            name: "nope".to_string(),
        });
        assert_eq!(store.state().current_dataset.as_deref(), Some("amp"));
        store.dispatch(&Action::SetCurrentDataset {
            name: "disp".to_string(),
        });
        assert!(store.state().needs_reference());
    }

    #[test]
    fn test_time_index_is_stored_unclamped() {
        let mut store = loaded_store();
        store.dispatch(&Action::SetTimeIndex { index: 50 });
        assert_eq!(store.state().time_index, 50);
        assert_eq!(store.state().clamped_time_index(), Some(1));
    }

    #[test]
    fn test_legacy_marker_creates_then_moves_selected_point() {
        let mut store = loaded_store();
        store.dispatch(&Action::SetMarkerPosition {
            position: LatLng::new(1.0, 1.0),
        });
        assert_eq!(store.state().points.len(), 1);
        let id = store.state().points.iter().next().unwrap().id;
        store.dispatch(&Action::SetSelectedPoint { id: Some(id) });
        store.dispatch(&Action::SetMarkerPosition {
            position: LatLng::new(2.0, 2.0),
        });
        let state = store.state();
        assert_eq!(state.points.len(), 1);
        assert_eq!(state.points.get(id).unwrap().position, LatLng::new(2.0, 2.0));
    }

    #[test]
    fn test_negative_zero_vmin_is_a_change() {
        let mut store = loaded_store();
        store.dispatch(&Action::SetVmin { value: 0.0 });
        let before = Arc::clone(store.state());
        let after = store.dispatch(&Action::SetVmin { value: -0.0 });
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.color_scale.vmin.is_sign_negative());
    }

    #[test]
    fn test_stores_are_independent() {
        let mut a = loaded_store();
        let b = loaded_store();
        a.dispatch(&Action::AddPoint {
            position: LatLng::new(0.0, 0.0),
            name: None,
        });
        assert_eq!(a.state().points.len(), 1);
        assert!(b.state().points.is_empty());
    }

    #[test]
    fn test_opacity_is_clamped() {
        let mut store = loaded_store();
        store.dispatch(&Action::SetOpacity { value: 3.0 });
        assert_eq!(store.state().color_scale.opacity, 1.0);
    }
}
