//! A browsing session: one state store plus the flows it drives.
//!
//! `dispatch` reduces an action and then lets each flow look at the new state.
//! Flows that need data spawn a task against the backend; the task posts a
//! [`Completion`] back to the session, which applies completions one at a time
//! in arrival order. Each flow drops responses that are no longer the latest
//! it issued.

use std::sync::Arc;

use bowser_common::{
    BowserApi, BowserResult, ChartData, ChartStatus, MultiPointRequest, PointId, TileJson,
    TileRequest, TrendResult,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::aggregator::{AggregatorPlan, TimeSeriesAggregator};
use crate::config::EngineConfig;
use crate::preferences::PreferenceStore;
use crate::reference::{ReferenceRequest, ReferenceShiftResolver};
use crate::state::{translate_legacy, Action, AppState, StateStore};
use crate::tile_request::TileFetcher;

/// Result of a spawned backend call, routed back to the flow that issued it.
#[derive(Debug)]
pub enum Completion {
    Tile {
        seq: u64,
        result: BowserResult<TileJson>,
    },
    Reference {
        request: ReferenceRequest,
        result: BowserResult<Vec<Option<f64>>>,
    },
    Aggregate {
        seq: u64,
        request: MultiPointRequest,
        result: BowserResult<ChartData>,
    },
}

pub struct Session {
    api: Arc<dyn BowserApi>,
    store: StateStore,
    preferences: PreferenceStore,
    tiles: TileFetcher,
    reference: ReferenceShiftResolver,
    aggregator: TimeSeriesAggregator,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
    updates: watch::Sender<Arc<AppState>>,
}

impl Session {
    pub fn new(api: Arc<dyn BowserApi>) -> Self {
        Self::with_state(api, AppState::default(), PreferenceStore::default())
    }

    pub fn from_config(api: Arc<dyn BowserApi>, config: &EngineConfig) -> Self {
        let mut state = AppState::with_palette(config.palette());
        state.color_scale = config.initial_color_scale();
        Self::with_state(api, state, config.preference_store())
    }

    pub fn with_state(
        api: Arc<dyn BowserApi>,
        initial: AppState,
        preferences: PreferenceStore,
    ) -> Self {
        let store = StateStore::new(initial);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (updates, _) = watch::channel(Arc::clone(store.state()));
        Self {
            api,
            store,
            preferences,
            tiles: TileFetcher::new(),
            reference: ReferenceShiftResolver::new(),
            aggregator: TimeSeriesAggregator::new(),
            completions_tx,
            completions_rx,
            in_flight: 0,
            updates,
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(self.store.state())
    }

    /// Receiver that sees every state published by `dispatch`.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AppState>> {
        self.updates.subscribe()
    }

    /// Number of backend calls whose completion has not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Fetch the catalog and data mode, then select the first dataset.
    pub async fn load_catalog(&mut self) -> BowserResult<Arc<AppState>> {
        let (datasets, mode) = futures::join!(self.api.datasets(), self.api.mode());

        match mode {
            Ok(mode) => {
                self.dispatch(Action::SetDataMode { mode });
            }
            Err(e) => warn!(error = %e, "Failed to fetch data mode, keeping {}", self.store.state().data_mode),
        }

        let datasets = datasets.map_err(|e| {
            error!(error = %e, "Failed to fetch dataset catalog");
            e
        })?;
        info!(datasets = datasets.len(), "Loaded dataset catalog");
        Ok(self.dispatch(Action::SetCatalog { datasets }))
    }

    /// Reduce `action` and start whatever requests the new state calls for.
    pub fn dispatch(&mut self, action: Action) -> Arc<AppState> {
        self.apply(action, true)
    }

    /// Like [`Session::dispatch`], but a color scale change is not written
    /// to the preference store.
    pub fn dispatch_transient(&mut self, action: Action) -> Arc<AppState> {
        self.apply(action, false)
    }

    fn apply(&mut self, action: Action, persist: bool) -> Arc<AppState> {
        let action = translate_legacy(self.store.state(), action);
        let prev = Arc::clone(self.store.state());
        let next = self.store.dispatch(&action);
        if Arc::ptr_eq(&prev, &next) {
            if action == Action::Unknown {
                debug!("Ignoring unknown action");
            }
            return next;
        }

        if prev.current_dataset != next.current_dataset {
            self.enter_dataset();
        } else if persist {
            self.persist_scale(&prev);
        }
        self.run_effects();

        let state = self.state();
        self.updates.send_replace(Arc::clone(&state));
        state
    }

    /// Dispatch an action given in its JSON form. Anything that does not
    /// decode to a known action is ignored.
    pub fn dispatch_json(&mut self, value: serde_json::Value) -> Arc<AppState> {
        match Action::from_json(value) {
            Ok(action) => self.dispatch(action),
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable action");
                self.state()
            }
        }
    }

    /// Wait for the next completion and apply it. Returns `None` when nothing
    /// is in flight.
    pub async fn process_next(&mut self) -> Option<Arc<AppState>> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        self.in_flight -= 1;
        self.apply_completion(completion);
        Some(self.state())
    }

    /// Apply completions until no request is in flight, including requests
    /// started by earlier completions.
    pub async fn settle(&mut self) -> Arc<AppState> {
        while self.process_next().await.is_some() {}
        self.state()
    }

    /// Fetch trend statistics for one point against the active dataset and
    /// cache them on the point. `Ok(None)` when there is no such point or no
    /// active dataset.
    pub async fn trend_for_point(&mut self, id: PointId) -> BowserResult<Option<TrendResult>> {
        let state = self.state();
        let (Some(dataset), Some(point)) = (state.current_dataset.clone(), state.points.get(id))
        else {
            return Ok(None);
        };
        let reference = state.reference_marker.filter(|_| state.needs_reference());

        let trend = self
            .api
            .trend_analysis(&dataset, point.position, reference)
            .await
            .map_err(|e| {
                warn!(point = %id, dataset = %dataset, error = %e, "Trend request failed");
                e
            })?;
        self.dispatch(Action::SetPointTrend { id, dataset, trend });
        Ok(Some(trend))
    }

    fn apply_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Tile { seq, result } => {
                if let Some(action) = self.tiles.accept(seq, result) {
                    self.dispatch(action);
                }
            }
            Completion::Reference { request, result } => {
                if let Some(action) = self.reference.accept(&request, result) {
                    self.dispatch(action);
                }
            }
            Completion::Aggregate {
                seq,
                request,
                result,
            } => {
                for action in self.aggregator.accept(seq, &request, result) {
                    self.dispatch(action);
                }
            }
        }
    }

    /// Apply stored preferences for the newly active dataset and place a
    /// default reference marker if the dataset needs one.
    fn enter_dataset(&mut self) {
        let state = self.state();
        let Some(group) = state.current_group() else {
            return;
        };

        let prefs = self.preferences.load(&group.name);
        if !prefs.is_empty() {
            debug!(dataset = %group.name, ?prefs, "Applying stored color scale");
        }
        for action in prefs.into_actions() {
            self.store.dispatch(&action);
        }

        if group.uses_spatial_ref && state.reference_marker.is_none() {
            if let Some(bounds) = group.latlon_bounds {
                self.store.dispatch(&Action::SetReferenceMarker {
                    position: bounds.center(),
                });
            }
        }
    }

    fn persist_scale(&mut self, prev: &AppState) {
        let state = self.state();
        let Some(dataset) = state.current_dataset.as_deref() else {
            return;
        };
        let (old, new) = (&prev.color_scale, &state.color_scale);
        let changed = old.colormap_name != new.colormap_name
            || old.vmin.to_bits() != new.vmin.to_bits()
            || old.vmax.to_bits() != new.vmax.to_bits();
        if changed {
            self.preferences.save(dataset, new);
        }
    }

    fn run_effects(&mut self) {
        let state = self.state();

        if let Some(request) = self.reference.plan(&state) {
            self.spawn_reference(request);
        }

        if let Some((seq, request)) = self.tiles.plan(&state) {
            self.spawn_tile(seq, request);
        }

        match self.aggregator.plan(&state) {
            Some(AggregatorPlan::Clear(status)) => {
                self.store.dispatch(&Action::SetChart { data: None, status });
            }
            Some(AggregatorPlan::Fetch { seq, request }) => {
                self.store.dispatch(&Action::SetChartStatus {
                    status: ChartStatus::Loading,
                });
                self.spawn_aggregate(seq, request);
            }
            None => {}
        }
    }

    fn spawn_tile(&mut self, seq: u64, request: TileRequest) {
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = api.tile_json(&request).await;
            let _ = tx.send(Completion::Tile { seq, result });
        });
    }

    fn spawn_reference(&mut self, request: ReferenceRequest) {
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = api.point_series(&request.dataset, request.position).await;
            let _ = tx.send(Completion::Reference { request, result });
        });
    }

    fn spawn_aggregate(&mut self, seq: u64, request: MultiPointRequest) {
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = api.multi_point(&request).await;
            let _ = tx.send(Completion::Aggregate {
                seq,
                request,
                result,
            });
        });
    }
}
