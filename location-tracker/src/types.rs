//! Core types for the location tracker library
//!
//! This module defines the values that flow between the location source, the
//! subscription manager and the lifecycle controller. A [`Position`] is an
//! immutable reading; every new fix supersedes the previous one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the tracker
pub type Timestamp = DateTime<Utc>;

/// Result type for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Text shown wherever no position has been received yet
pub const UNKNOWN_LOCATION_TEXT: &str = "Unknown location";

/// Raw location event as delivered by the OS location source
///
/// The capture time is optional because some sources only stamp the batch,
/// not the individual fix. Missing times are filled in at normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLocation {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Capture time reported by the source (if any)
    pub time: Option<Timestamp>,
}

impl RawLocation {
    /// Create a raw location without a capture time
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            time: None,
        }
    }

    /// Builder method: attach the capture time
    pub fn with_time(mut self, time: Timestamp) -> Self {
        self.time = Some(time);
        self
    }
}

/// Normalized latitude/longitude reading with capture time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub captured_at: Timestamp,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, captured_at: Timestamp) -> Self {
        Self {
            latitude,
            longitude,
            captured_at,
        }
    }

    /// Normalize a raw OS event, stamping it with the current time if the
    /// source did not provide one
    pub fn from_raw(raw: &RawLocation) -> Self {
        Self::new(
            raw.latitude,
            raw.longitude,
            raw.time.unwrap_or_else(Utc::now),
        )
    }

    /// Latitude as stored in the preference store
    pub fn latitude_text(&self) -> String {
        format_coordinate(self.latitude)
    }

    /// Longitude as stored in the preference store
    pub fn longitude_text(&self) -> String {
        format_coordinate(self.longitude)
    }

    /// OpenStreetMap link centred on this position
    pub fn map_url(&self) -> String {
        format!(
            "https://www.openstreetmap.org/?mlat={}&mlon={}#map=16/{}/{}",
            self.latitude_text(),
            self.longitude_text(),
            self.latitude_text(),
            self.longitude_text()
        )
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude_text(), self.longitude_text())
    }
}

/// Render an optional position the way the notification and the UI show it
pub fn position_text(position: Option<&Position>) -> String {
    match position {
        Some(position) => position.to_string(),
        None => UNKNOWN_LOCATION_TEXT.to_string(),
    }
}

// `{:?}` keeps the trailing ".0" on whole degrees ("1.0" rather than "1")
fn format_coordinate(value: f64) -> String {
    format!("{:?}", value)
}

/// Errors that can occur while tracking
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Location permission not granted: {0}")]
    PermissionDenied(String),

    #[error("Failed to cancel location updates: {0}")]
    CancellationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Location service is no longer running")]
    ServiceStopped,
}

impl TrackerError {
    /// True if this error means location permission is missing
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, TrackerError::PermissionDenied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_position_text() {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let position = Position::new(37.4, -122.1, time);

        assert_eq!(position.to_string(), "(37.4, -122.1)");
        assert_eq!(position_text(Some(&position)), "(37.4, -122.1)");
        assert_eq!(position_text(None), "Unknown location");
    }

    #[test]
    fn test_whole_degrees_keep_fraction() {
        let position = Position::new(1.0, -2.0, Utc::now());
        assert_eq!(position.latitude_text(), "1.0");
        assert_eq!(position.to_string(), "(1.0, -2.0)");
    }

    #[test]
    fn test_from_raw_keeps_source_time() {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let raw = RawLocation::new(48.85, 2.35).with_time(time);

        let position = Position::from_raw(&raw);
        assert_eq!(position.latitude, 48.85);
        assert_eq!(position.longitude, 2.35);
        assert_eq!(position.captured_at, time);
    }

    #[test]
    fn test_from_raw_stamps_missing_time() {
        let before = Utc::now();
        let position = Position::from_raw(&RawLocation::new(0.5, 0.5));
        assert!(position.captured_at >= before);
    }

    #[test]
    fn test_map_url() {
        let position = Position::new(37.4, -122.1, Utc::now());
        assert_eq!(
            position.map_url(),
            "https://www.openstreetmap.org/?mlat=37.4&mlon=-122.1#map=16/37.4/-122.1"
        );
    }
}
