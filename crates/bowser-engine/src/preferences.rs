//! Per-dataset color scale preferences.
//!
//! Preferences live in a flat string key-value store under
//! `"{dataset}-colormap_name"`, `"{dataset}-vmin"` and `"{dataset}-vmax"`.
//! Reading and writing never fails from the caller's point of view: storage
//! errors are logged and treated as "nothing stored".

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bowser_common::{BowserError, BowserResult, ColorScaleConfig};
use tracing::{debug, warn};

use crate::state::Action;

/// Minimal string key-value storage.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> BowserResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> BowserResult<()>;
}

/// In-process store. Contents are lost with the session.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> BowserResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> BowserResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by one JSON object on disk. The whole file is rewritten on
/// every `set`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open `path`, starting empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> BowserResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                BowserError::StorageUnavailable(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(BowserError::StorageUnavailable(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "Opened preference file");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> BowserResult<()> {
        let body = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| BowserError::StorageUnavailable(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, body)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> BowserResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> BowserResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

/// Stored preferences for one dataset. Absent or unparsable entries are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalePreferences {
    pub colormap_name: Option<String>,
    pub vmin: Option<f64>,
    pub vmax: Option<f64>,
}

impl ScalePreferences {
    pub fn is_empty(&self) -> bool {
        self.colormap_name.is_none() && self.vmin.is_none() && self.vmax.is_none()
    }

    /// Actions that apply the stored values to the global color scale.
    pub fn into_actions(self) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some(name) = self.colormap_name {
            actions.push(Action::SetColormap { name });
        }
        if let Some(value) = self.vmin {
            actions.push(Action::SetVmin { value });
        }
        if let Some(value) = self.vmax {
            actions.push(Action::SetVmax { value });
        }
        actions
    }
}

pub struct PreferenceStore {
    backend: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore").finish_non_exhaustive()
    }
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl PreferenceStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn load(&self, dataset: &str) -> ScalePreferences {
        ScalePreferences {
            colormap_name: self
                .read(&colormap_key(dataset))
                .filter(|name| !name.is_empty()),
            vmin: self.read(&vmin_key(dataset)).and_then(|v| parse_limit(&v)),
            vmax: self.read(&vmax_key(dataset)).and_then(|v| parse_limit(&v)),
        }
    }

    pub fn save(&mut self, dataset: &str, config: &ColorScaleConfig) {
        self.write(&colormap_key(dataset), &config.colormap_name);
        self.write(&vmin_key(dataset), &format_limit(config.vmin));
        self.write(&vmax_key(dataset), &format_limit(config.vmax));
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read preference");
                None
            }
        }
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = self.backend.set(key, value) {
            warn!(key = key, error = %e, "Failed to write preference");
        }
    }
}

fn colormap_key(dataset: &str) -> String {
    format!("{dataset}-colormap_name")
}

fn vmin_key(dataset: &str) -> String {
    format!("{dataset}-vmin")
}

fn vmax_key(dataset: &str) -> String {
    format!("{dataset}-vmax")
}

/// Shortest round-tripping decimal form. Negative zero is written as `"-0"`.
fn format_limit(value: f64) -> String {
    if value == 0.0 && value.is_sign_negative() {
        return "-0".to_string();
    }
    value.to_string()
}

fn parse_limit(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
