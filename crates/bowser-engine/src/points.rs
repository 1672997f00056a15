//! Sample point collection: identity, color assignment, visibility, selection.
//!
//! ## Color assignment
//!
//! New points take the lowest-indexed palette color not held by a live
//! point. Once every palette color is taken, colors cycle by live count
//! (`palette[len % N]`), so duplicates appear only beyond N points. A color
//! freed by removal is therefore available to the very next point.

use std::sync::Arc;

use bowser_common::{LatLng, PointId, PointPayload, TimeSeriesPoint, TrendResult, DEFAULT_PALETTE};
use serde::{Deserialize, Serialize};

/// Partial update for an existing point. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Option<LatLng>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointRegistry {
    palette: Arc<[String]>,
    points: Vec<TimeSeriesPoint>,
    selected: Option<PointId>,
    next_id: u64,
}

impl Default for PointRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect())
    }
}

impl PointRegistry {
    /// Create an empty registry. An empty palette falls back to the default one.
    pub fn new(palette: Vec<String>) -> Self {
        let palette: Vec<String> = if palette.is_empty() {
            DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
        } else {
            palette
        };
        Self {
            palette: palette.into(),
            points: Vec::new(),
            selected: None,
            next_id: 1,
        }
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeSeriesPoint> {
        self.points.iter()
    }

    pub fn get(&self, id: PointId) -> Option<&TimeSeriesPoint> {
        self.points.iter().find(|p| p.id == id)
    }

    fn get_mut(&mut self, id: PointId) -> Option<&mut TimeSeriesPoint> {
        self.points.iter_mut().find(|p| p.id == id)
    }

    pub fn selected(&self) -> Option<PointId> {
        self.selected
    }

    pub fn selected_point(&self) -> Option<&TimeSeriesPoint> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Color the next created point will receive.
    pub fn next_color(&self) -> String {
        self.palette
            .iter()
            .find(|color| !self.points.iter().any(|p| &p.color == *color))
            .cloned()
            .unwrap_or_else(|| self.palette[self.points.len() % self.palette.len()].clone())
    }

    /// Create a visible point and return its id.
    pub fn add(&mut self, position: LatLng, name: Option<String>) -> PointId {
        let id = PointId(self.next_id);
        self.next_id += 1;
        let color = self.next_color();
        let name = name.unwrap_or_else(|| format!("Point {}", id));
        self.points
            .push(TimeSeriesPoint::new(id, name, position, color));
        id
    }

    /// Remove a point. Unknown ids are a no-op. Clears the selection if it
    /// pointed at the removed point.
    pub fn remove(&mut self, id: PointId) -> bool {
        let before = self.points.len();
        self.points.retain(|p| p.id != id);
        if self.points.len() == before {
            return false;
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        true
    }

    /// Remove every point and the selection. Ids keep counting up.
    pub fn clear(&mut self) -> bool {
        if self.points.is_empty() && self.selected.is_none() {
            return false;
        }
        self.points.clear();
        self.selected = None;
        true
    }

    /// Apply a partial update. Returns `true` if anything changed.
    pub fn update(&mut self, id: PointId, update: &PointUpdate) -> bool {
        let Some(point) = self.get_mut(id) else {
            return false;
        };
        let mut changed = false;
        if let Some(name) = &update.name {
            changed |= replace(&mut point.name, name.clone());
        }
        if let Some(position) = update.position {
            changed |= replace(&mut point.position, position);
        }
        if let Some(color) = &update.color {
            changed |= replace(&mut point.color, color.clone());
        }
        if let Some(visible) = update.visible {
            changed |= replace(&mut point.visible, visible);
        }
        changed
    }

    pub fn toggle_visibility(&mut self, id: PointId) -> bool {
        match self.get_mut(id) {
            Some(point) => {
                point.visible = !point.visible;
                true
            }
            None => false,
        }
    }

    /// Select a live point, or clear the selection with `None`.
    pub fn select(&mut self, id: Option<PointId>) -> bool {
        if let Some(id) = id {
            if self.get(id).is_none() {
                return false;
            }
        }
        replace(&mut self.selected, id)
    }

    pub fn set_series(&mut self, id: PointId, dataset: &str, values: Vec<Option<f64>>) -> bool {
        match self.get_mut(id) {
            Some(point) => point.data.insert(dataset.to_string(), values.clone()) != Some(values),
            None => false,
        }
    }

    pub fn set_trend(&mut self, id: PointId, dataset: &str, trend: TrendResult) -> bool {
        match self.get_mut(id) {
            Some(point) => point.trend_data.insert(dataset.to_string(), trend) != Some(trend),
            None => false,
        }
    }

    /// Batched request entries for every visible point, in creation order.
    pub fn visible_payloads(&self) -> Vec<PointPayload> {
        self.points
            .iter()
            .filter(|p| p.visible)
            .map(|p| PointPayload {
                id: p.id,
                lat: p.position.lat,
                lon: p.position.lng,
                color: p.color.clone(),
                name: p.name.clone(),
            })
            .collect()
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
