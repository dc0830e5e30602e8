//! Route-replaying location source
//!
//! Replays a fixed list of waypoints at the requested interval. Used by the
//! CLI in place of a device location API, and by tests that need a source
//! with real timing. Permission denial and cancellation failure can be
//! switched on to exercise the error paths.
//!
//! Requires a running tokio runtime: each subscription is a spawned task.

use super::{CancelHandle, LocationProvider, LocationUpdates};
use crate::config::LocationRequest;
use crate::types::{RawLocation, Result, TrackerError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Behaviour of a [`SimulatedProvider`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Waypoints as `[latitude, longitude]`, replayed in a loop
    #[serde(default = "default_route")]
    pub route: Vec<[f64; 2]>,

    /// Overrides the request interval (useful to speed up demos)
    #[serde(default)]
    pub interval_ms: Option<u64>,

    /// Stop the stream after this many fixes
    #[serde(default)]
    pub max_fixes: Option<usize>,

    #[serde(default = "default_true")]
    pub permission_granted: bool,

    /// Make every cancellation request fail
    #[serde(default)]
    pub fail_cancel: bool,

    /// Delay before a cancellation is confirmed
    #[serde(default)]
    pub cancel_delay_ms: u64,
}

fn default_route() -> Vec<[f64; 2]> {
    vec![
        [37.4220, -122.0841],
        [37.4225, -122.0850],
        [37.4231, -122.0862],
        [37.4236, -122.0871],
    ]
}

fn default_true() -> bool {
    true
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            route: default_route(),
            interval_ms: None,
            max_fixes: None,
            permission_granted: true,
            fail_cancel: false,
            cancel_delay_ms: 0,
        }
    }
}

impl SimulationSettings {
    /// Check the route and the interval override
    pub fn validate(&self) -> Result<()> {
        if self.route.is_empty() {
            return Err(TrackerError::InvalidConfig(
                "simulation route is empty".to_string(),
            ));
        }
        if self.interval_ms == Some(0) {
            return Err(TrackerError::InvalidConfig(
                "simulation interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Location source that replays [`SimulationSettings::route`]
pub struct SimulatedProvider {
    settings: SimulationSettings,
    task: Option<JoinHandle<()>>,
}

impl SimulatedProvider {
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            settings,
            task: None,
        }
    }

    /// Grant or revoke location permission for subsequent requests
    pub fn set_permission_granted(&mut self, granted: bool) {
        self.settings.permission_granted = granted;
    }

    /// True while a replay task is delivering updates
    pub fn is_delivering(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl LocationProvider for SimulatedProvider {
    fn request_updates(&mut self, request: &LocationRequest) -> Result<LocationUpdates> {
        if !self.settings.permission_granted {
            return Err(TrackerError::PermissionDenied(
                "ACCESS_FINE_LOCATION not granted".to_string(),
            ));
        }
        request.validate()?;
        self.settings.validate()?;

        if let Some(previous) = self.task.take() {
            previous.abort();
        }

        let interval = self
            .settings
            .interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| request.interval());
        let route = self.settings.route.clone();
        let max_fixes = self.settings.max_fixes;
        let (tx, rx) = mpsc::channel(16);

        log::debug!(
            "Simulated source replaying {} waypoints every {:?}",
            route.len(),
            interval
        );

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut sent = 0usize;
            for [latitude, longitude] in route.iter().copied().cycle() {
                if max_fixes.is_some_and(|max| sent >= max) {
                    break;
                }
                ticker.tick().await;
                let raw = RawLocation::new(latitude, longitude).with_time(Utc::now());
                if tx.send(raw).await.is_err() {
                    break;
                }
                sent += 1;
            }
            log::trace!("Simulated source finished after {} fixes", sent);
        }));

        Ok(rx)
    }

    fn cancel(&mut self) -> CancelHandle {
        if self.settings.fail_cancel {
            return CancelHandle::completed(Err(TrackerError::CancellationFailed(
                "simulated source refused to cancel".to_string(),
            )));
        }

        let task = self.task.take();
        let delay = Duration::from_millis(self.settings.cancel_delay_ms);
        if delay.is_zero() {
            if let Some(task) = task {
                task.abort();
            }
            return CancelHandle::completed(Ok(()));
        }

        let (completer, handle) = CancelHandle::pending();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(task) = task {
                task.abort();
            }
            completer.complete(Ok(()));
        });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_settings() -> SimulationSettings {
        SimulationSettings {
            route: vec![[1.0, 2.0], [3.0, 4.0]],
            interval_ms: Some(5),
            ..SimulationSettings::default()
        }
    }

    #[tokio::test]
    async fn test_replays_route_in_order() {
        let mut provider = SimulatedProvider::new(fast_settings());
        let mut updates = provider.request_updates(&LocationRequest::new()).unwrap();

        let first = updates.recv().await.unwrap();
        let second = updates.recv().await.unwrap();
        let third = updates.recv().await.unwrap();

        assert_eq!((first.latitude, first.longitude), (1.0, 2.0));
        assert_eq!((second.latitude, second.longitude), (3.0, 4.0));
        assert_eq!((third.latitude, third.longitude), (1.0, 2.0));
        assert!(first.time.is_some());
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let mut provider = SimulatedProvider::new(SimulationSettings {
            permission_granted: false,
            ..fast_settings()
        });

        let err = provider.request_updates(&LocationRequest::new()).unwrap_err();
        assert!(err.is_permission_denied());
        assert!(!provider.is_delivering());
    }

    #[tokio::test]
    async fn test_zero_interval_request_rejected() {
        let mut provider = SimulatedProvider::new(SimulationSettings::default());
        let request = LocationRequest::new().with_interval(Duration::ZERO);

        let err = provider.request_updates(&request).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidConfig(_)));
        assert!(!provider.is_delivering());
    }

    #[tokio::test]
    async fn test_zero_interval_override_rejected() {
        let mut provider = SimulatedProvider::new(SimulationSettings {
            interval_ms: Some(0),
            ..fast_settings()
        });

        let err = provider.request_updates(&LocationRequest::new()).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidConfig(_)));
        assert!(!provider.is_delivering());
    }

    #[tokio::test]
    async fn test_empty_route_rejected() {
        let mut provider = SimulatedProvider::new(SimulationSettings {
            route: Vec::new(),
            ..fast_settings()
        });

        let err = provider.request_updates(&LocationRequest::new()).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_max_fixes_closes_stream() {
        let mut provider = SimulatedProvider::new(SimulationSettings {
            max_fixes: Some(2),
            ..fast_settings()
        });
        let mut updates = provider.request_updates(&LocationRequest::new()).unwrap();

        assert!(updates.recv().await.is_some());
        assert!(updates.recv().await.is_some());
        assert!(updates.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_stops_delivery() {
        let mut provider = SimulatedProvider::new(fast_settings());
        let mut updates = provider.request_updates(&LocationRequest::new()).unwrap();
        updates.recv().await.unwrap();

        provider.cancel().completion().await.unwrap();

        while updates.recv().await.is_some() {}
        assert!(!provider.is_delivering());
    }

    #[tokio::test]
    async fn test_delayed_cancel_confirms_later() {
        let mut provider = SimulatedProvider::new(SimulationSettings {
            cancel_delay_ms: 20,
            ..fast_settings()
        });
        let _updates = provider.request_updates(&LocationRequest::new()).unwrap();

        let handle = provider.cancel();
        assert!(handle.completion().await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_cancel() {
        let mut provider = SimulatedProvider::new(SimulationSettings {
            fail_cancel: true,
            ..fast_settings()
        });
        let _updates = provider.request_updates(&LocationRequest::new()).unwrap();

        let result = provider.cancel().completion().await;
        assert!(matches!(result, Err(TrackerError::CancellationFailed(_))));
        assert!(provider.is_delivering());
    }
}
