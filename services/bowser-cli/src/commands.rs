//! Subcommand implementations. Each one drives a `Session` the way an
//! interactive client would and returns what a renderer would receive.

use anyhow::{anyhow, bail, Context, Result};
use bowser_common::{BowserError, ChartData, ChartStatus, DataMode, LatLng, TrendResult};
use bowser_engine::{Action, Session};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub name: String,
    pub time_steps: usize,
    pub algorithm: Option<String>,
    pub uses_spatial_ref: bool,
    pub first: Option<String>,
    pub last: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetListing {
    pub mode: DataMode,
    pub datasets: Vec<DatasetSummary>,
}

impl DatasetListing {
    pub fn to_table(&self) -> String {
        let mut out = format!("mode: {}\n", self.mode);
        for d in &self.datasets {
            out.push_str(&format!(
                "{:<24} {:>5} steps  {:<10} {}  {} .. {}\n",
                d.name,
                d.time_steps,
                d.algorithm.as_deref().unwrap_or("-"),
                if d.uses_spatial_ref { "ref" } else { "abs" },
                d.first.as_deref().unwrap_or("?"),
                d.last.as_deref().unwrap_or("?"),
            ));
        }
        out
    }
}

/// Display overrides for the `tile` command. They apply to one invocation
/// and are never saved as dataset preferences.
#[derive(Debug, Clone, Default)]
pub struct ScaleOverrides {
    pub colormap: Option<String>,
    pub vmin: Option<f64>,
    pub vmax: Option<f64>,
}

pub async fn list_datasets(session: &mut Session) -> Result<DatasetListing> {
    let state = session.load_catalog().await?;
    let datasets = state
        .catalog
        .values()
        .map(|g| DatasetSummary {
            name: g.name.clone(),
            time_steps: g.time_len(),
            algorithm: g.algorithm.clone(),
            uses_spatial_ref: g.uses_spatial_ref,
            first: g.x_values.first().map(|x| x.to_string()),
            last: g.x_values.last().map(|x| x.to_string()),
        })
        .collect();
    Ok(DatasetListing {
        mode: state.data_mode,
        datasets,
    })
}

/// Load the catalog, activate `dataset` and optionally place the reference
/// marker, then wait for every resulting request.
async fn open_dataset(
    session: &mut Session,
    dataset: &str,
    reference: Option<LatLng>,
) -> Result<()> {
    let state = session.load_catalog().await?;
    if !state.catalog.contains_key(dataset) {
        return Err(BowserError::DatasetNotFound(dataset.to_string()).into());
    }
    session.dispatch(Action::SetCurrentDataset {
        name: dataset.to_string(),
    });
    if let Some(position) = reference {
        session.dispatch(Action::SetReferenceMarker { position });
    }
    session.settle().await;
    Ok(())
}

pub async fn tile_url(
    session: &mut Session,
    dataset: &str,
    time_idx: i64,
    reference: Option<LatLng>,
    overrides: ScaleOverrides,
) -> Result<String> {
    open_dataset(session, dataset, reference).await?;

    session.dispatch(Action::SetTimeIndex { index: time_idx });
    if let Some(name) = overrides.colormap {
        session.dispatch_transient(Action::SetColormap { name });
    }
    if let Some(value) = overrides.vmin {
        session.dispatch_transient(Action::SetVmin { value });
    }
    if let Some(value) = overrides.vmax {
        session.dispatch_transient(Action::SetVmax { value });
    }
    let state = session.settle().await;

    state
        .tile_url
        .clone()
        .ok_or_else(|| anyhow!("tile service returned no url for {}", dataset))
}

pub async fn series(
    session: &mut Session,
    dataset: &str,
    points: &[LatLng],
    reference: Option<LatLng>,
    trends: bool,
) -> Result<ChartData> {
    if points.is_empty() {
        bail!("at least one --point is required");
    }
    open_dataset(session, dataset, reference).await?;

    session.dispatch(Action::ToggleChart);
    if trends {
        session.dispatch(Action::ToggleTrends);
    }
    for position in points {
        session.dispatch(Action::AddPoint {
            position: *position,
            name: None,
        });
    }
    let state = session.settle().await;

    match state.chart.status {
        ChartStatus::Ready | ChartStatus::Empty => {
            info!(series = state.chart.data.as_ref().map_or(0, |d| d.datasets.len()), "Fetched chart data");
            Ok(state.chart.data.clone().unwrap_or_default())
        }
        status => bail!(
            "{}",
            status.message().unwrap_or("time series request did not complete")
        ),
    }
}

pub async fn trend(
    session: &mut Session,
    dataset: &str,
    point: LatLng,
    reference: Option<LatLng>,
) -> Result<TrendResult> {
    open_dataset(session, dataset, reference).await?;
    let state = session.dispatch(Action::AddPoint {
        position: point,
        name: None,
    });
    let id = state
        .points
        .iter()
        .last()
        .map(|p| p.id)
        .context("point was not created")?;
    session
        .trend_for_point(id)
        .await?
        .context("no trend for point")
}
