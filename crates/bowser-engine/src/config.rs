//! Engine configuration loading and types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use bowser_common::{BowserError, ColorScaleConfig, DEFAULT_PALETTE};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::preferences::{JsonFileStore, PreferenceStore};

/// Engine configuration, loaded from YAML and/or the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root url of the tile and time series service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Point color palette. Empty means the built-in palette.
    #[serde(default)]
    pub palette: Vec<String>,

    /// JSON file for persisted color scale preferences. In-memory when unset.
    #[serde(default)]
    pub preferences_path: Option<PathBuf>,

    #[serde(default = "default_colormap")]
    pub default_colormap: String,

    #[serde(default = "default_vmin")]
    pub default_vmin: f64,

    #[serde(default = "default_vmax")]
    pub default_vmax: f64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_colormap() -> String {
    ColorScaleConfig::default().colormap_name
}

fn default_vmin() -> f64 {
    ColorScaleConfig::default().vmin
}

fn default_vmax() -> f64 {
    ColorScaleConfig::default().vmax
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_timeout_secs(),
            palette: Vec::new(),
            preferences_path: None,
            default_colormap: default_colormap(),
            default_vmin: default_vmin(),
            default_vmax: default_vmax(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("Failed to parse engine config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file, then apply overrides found through `lookup`
    /// (normally `std::env::var`).
    pub fn load_from_file_with(
        path: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {:?}", path))?;
        let mut config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse: {:?}", path))?;
        config.apply_env(lookup)?;
        config.validate()?;
        info!(path = %path.display(), base_url = %config.base_url, "Loaded engine config");
        Ok(config)
    }

    /// Defaults overridden by whatever `lookup` returns for `BOWSER_URL`,
    /// `BOWSER_TIMEOUT_SECS` and `BOWSER_PREFERENCES`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("BOWSER_URL") {
            self.base_url = url;
        }
        if let Some(secs) = lookup("BOWSER_TIMEOUT_SECS") {
            self.request_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("BOWSER_TIMEOUT_SECS is not a number: {}", secs))?;
        }
        if let Some(path) = lookup("BOWSER_PREFERENCES") {
            self.preferences_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), BowserError> {
        if self.base_url.trim().is_empty() {
            return Err(BowserError::Config("base_url must not be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(BowserError::Config(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if !self.default_vmin.is_finite() || !self.default_vmax.is_finite() {
            return Err(BowserError::Config(
                "default_vmin and default_vmax must be finite".into(),
            ));
        }
        if self.palette.iter().any(|c| c.trim().is_empty()) {
            return Err(BowserError::Config("palette entries must not be empty".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn palette(&self) -> Vec<String> {
        if self.palette.is_empty() {
            DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
        } else {
            self.palette.clone()
        }
    }

    pub fn initial_color_scale(&self) -> ColorScaleConfig {
        ColorScaleConfig {
            colormap_name: self.default_colormap.clone(),
            vmin: self.default_vmin,
            vmax: self.default_vmax,
            ..Default::default()
        }
    }

    /// Preference store for this config. An unusable preference file falls
    /// back to in-memory storage.
    pub fn preference_store(&self) -> PreferenceStore {
        match &self.preferences_path {
            Some(path) => match JsonFileStore::open(path) {
                Ok(store) => PreferenceStore::new(store),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Preference file unusable, keeping preferences in memory");
                    PreferenceStore::default()
                }
            },
            None => PreferenceStore::default(),
        }
    }
}
