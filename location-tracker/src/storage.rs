//! Persistent preference storage
//!
//! The tracking flag and the last known position must survive process
//! restarts. Storage is a plain key-value collaborator ([`KeyValueStore`]);
//! [`PreferenceStore`] layers the tracker's keys and value formats on top.

use crate::types::{Position, Result, Timestamp, UNKNOWN_LOCATION_TEXT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted tracking flag (`TrackingState.enabled`)
pub const KEY_FOREGROUND_ENABLED: &str = "tracking_foreground_location";
/// Textual form of the last position, e.g. `(37.4, -122.1)`
pub const KEY_CURRENT_LOCATION: &str = "current_location";
pub const KEY_CURRENT_LATITUDE: &str = "current_latitude";
pub const KEY_CURRENT_LONGITUDE: &str = "current_longitude";
/// Capture time of the last position, RFC 3339
pub const KEY_CURRENT_CAPTURED_AT: &str = "current_captured_at";

/// A value held by a [`KeyValueStore`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Bool(bool),
    Text(String),
}

/// Key-value storage collaborator
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<StoredValue>;

    fn set(&mut self, key: &str, value: StoredValue) -> Result<()>;

    /// Write several values as one update
    ///
    /// The default writes them one by one; stores with a costly commit
    /// should override it to commit once.
    fn set_many(&mut self, entries: &[(&str, StoredValue)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value.clone())?;
        }
        Ok(())
    }
}

/// In-memory store; contents are lost with the process
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: StoredValue) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a JSON object on disk
///
/// Every write rewrites the whole file through a temporary sibling, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, StoredValue>,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let content = fs::read_to_string(path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        log::debug!("Opened preference file {:?} ({} keys)", path, values.len());
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&self.values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: StoredValue) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }

    fn set_many(&mut self, entries: &[(&str, StoredValue)]) -> Result<()> {
        for (key, value) in entries {
            self.values.insert(key.to_string(), value.clone());
        }
        self.flush()
    }
}

/// Typed access to the tracker's preferences
#[derive(Debug)]
pub struct PreferenceStore<S> {
    store: S,
}

impl<S: KeyValueStore> PreferenceStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// True if location tracking was last requested on; false when unset
    pub fn location_tracking(&self) -> bool {
        match self.store.get(KEY_FOREGROUND_ENABLED) {
            Some(StoredValue::Bool(enabled)) => enabled,
            _ => false,
        }
    }

    pub fn save_location_tracking(&mut self, enabled: bool) -> Result<()> {
        log::trace!("Persisting {} = {}", KEY_FOREGROUND_ENABLED, enabled);
        self.store
            .set(KEY_FOREGROUND_ENABLED, StoredValue::Bool(enabled))
    }

    /// Persist a position together with its textual form, in one update
    pub fn save_current_location(&mut self, position: &Position) -> Result<()> {
        self.store.set_many(&[
            (KEY_CURRENT_LOCATION, StoredValue::Text(position.to_string())),
            (KEY_CURRENT_LATITUDE, StoredValue::Text(position.latitude_text())),
            (KEY_CURRENT_LONGITUDE, StoredValue::Text(position.longitude_text())),
            (
                KEY_CURRENT_CAPTURED_AT,
                StoredValue::Text(position.captured_at.to_rfc3339()),
            ),
        ])
    }

    /// Textual form of the last stored position, or "Unknown location"
    pub fn current_location(&self) -> String {
        self.text(KEY_CURRENT_LOCATION)
            .unwrap_or_else(|| UNKNOWN_LOCATION_TEXT.to_string())
    }

    pub fn current_latitude(&self) -> Option<f64> {
        self.text(KEY_CURRENT_LATITUDE)?.parse().ok()
    }

    pub fn current_longitude(&self) -> Option<f64> {
        self.text(KEY_CURRENT_LONGITUDE)?.parse().ok()
    }

    /// Last stored coordinates as a pair, if both parse
    pub fn current_coordinates(&self) -> Option<(f64, f64)> {
        Some((self.current_latitude()?, self.current_longitude()?))
    }

    /// Capture time stored with the last position
    pub fn current_captured_at(&self) -> Option<Timestamp> {
        let text = self.text(KEY_CURRENT_CAPTURED_AT)?;
        DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|time| time.with_timezone(&Utc))
    }

    /// Last stored position
    ///
    /// Files written before capture times were stored have none; such a
    /// position is stamped with `fallback`.
    pub fn current_position(&self, fallback: Timestamp) -> Option<Position> {
        let (latitude, longitude) = self.current_coordinates()?;
        let captured_at = self.current_captured_at().unwrap_or(fallback);
        Some(Position::new(latitude, longitude, captured_at))
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    fn text(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Some(StoredValue::Text(text)) => Some(text),
            _ => None,
        }
    }
}
