//! Configuration loading and parsing

use anyhow::{Context, Result};
use location_tracker::{LocationRequest, NotificationConfig, SimulationSettings, TrackerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub request: LocationRequest,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Preference file holding the tracking flag and last position
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("location-tracker.json")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl AppConfig {
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig::new()
            .with_request(self.request.clone())
            .with_notification(self.notification.clone())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .request
        .validate()
        .with_context(|| format!("Config file {:?}: invalid [request] section", path))?;
    config
        .simulation
        .validate()
        .with_context(|| format!("Config file {:?}: invalid [simulation] section", path))?;

    Ok(config)
}
