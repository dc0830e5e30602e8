//! Tracker configuration types
//!
//! This module defines the location request sent to the OS source and the
//! texts used when the service has to present itself as a notification.
//! Everything here is plain data; the controller decides when it is used.

use crate::types::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Accuracy/power trade-off requested from the location source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Most accurate fix available (GPS)
    #[default]
    HighAccuracy,
    /// City-block accuracy
    BalancedPowerAccuracy,
    /// City-level accuracy
    LowPower,
    /// Only fixes requested by other applications
    NoPower,
}

/// Parameters of a location subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRequest {
    /// Desired interval between updates in milliseconds (default: 1000ms)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Fastest interval the application can handle in milliseconds (default: 1000ms)
    #[serde(default = "default_interval_ms")]
    pub fastest_interval_ms: u64,

    /// Maximum time updates may be batched before delivery in milliseconds (default: 1000ms)
    #[serde(default = "default_interval_ms")]
    pub max_wait_ms: u64,

    #[serde(default)]
    pub priority: Priority,
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            fastest_interval_ms: default_interval_ms(),
            max_wait_ms: default_interval_ms(),
            priority: Priority::default(),
        }
    }
}

impl LocationRequest {
    /// Create the default request: 1s interval, 1s fastest, 1s max wait, high accuracy
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the update interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.as_millis() as u64;
        self
    }

    /// Builder method: set the fastest update interval
    pub fn with_fastest_interval(mut self, interval: Duration) -> Self {
        self.fastest_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Builder method: set the maximum batching delay
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait_ms = max_wait.as_millis() as u64;
        self
    }

    /// Builder method: set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn fastest_interval(&self) -> Duration {
        Duration::from_millis(self.fastest_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// Reject requests no location source can honour
    ///
    /// All three durations must be non-zero.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("interval_ms", self.interval_ms),
            ("fastest_interval_ms", self.fastest_interval_ms),
            ("max_wait_ms", self.max_wait_ms),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(TrackerError::InvalidConfig(format!(
                    "location request {} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Texts and identifiers of the ongoing foreground notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Notification id; re-rendering with the same id updates in place
    #[serde(default = "default_notification_id")]
    pub notification_id: u32,

    #[serde(default = "default_channel_id")]
    pub channel_id: String,

    /// Notification title (the application name)
    #[serde(default = "default_title")]
    pub title: String,

    /// Label of the action that brings the UI back
    #[serde(default = "default_launch_label")]
    pub launch_label: String,

    /// Label of the action that stops tracking
    #[serde(default = "default_cancel_label")]
    pub cancel_label: String,
}

fn default_notification_id() -> u32 {
    12345678
}

fn default_channel_id() -> String {
    "while_in_use_channel_01".to_string()
}

fn default_title() -> String {
    "Location Tracker".to_string()
}

fn default_launch_label() -> String {
    "Launch activity".to_string()
}

fn default_cancel_label() -> String {
    "Stop receiving location updates".to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            notification_id: default_notification_id(),
            channel_id: default_channel_id(),
            title: default_title(),
            launch_label: default_launch_label(),
            cancel_label: default_cancel_label(),
        }
    }
}

impl NotificationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the notification title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Complete tracker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub request: LocationRequest,

    #[serde(default)]
    pub notification: NotificationConfig,
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: replace the location request
    pub fn with_request(mut self, request: LocationRequest) -> Self {
        self.request = request;
        self
    }

    /// Builder method: replace the notification texts
    pub fn with_notification(mut self, notification: NotificationConfig) -> Self {
        self.notification = notification;
        self
    }
}
