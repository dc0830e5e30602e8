//! Location Tracker Library
//!
//! Core of a while-in-use location tracker: one location subscription,
//! persisted tracking state, and a service that promotes itself to a
//! foreground notification whenever no UI is attached while tracking.
//!
//! # Architecture
//!
//! - [`LocationSubscriptionManager`] owns the single live subscription and
//!   the last known position
//! - [`ServiceLifecycleController`] runs the lifecycle state machine
//!   ([`lifecycle`]) and drives storage, notification and broadcast
//! - [`LocationService`] serializes commands and updates on one task
//! - [`TrackingClient`] is the UI side: bind, observe, toggle
//!
//! The platform is never touched directly. The location source, the
//! key-value store, the notification layer and the permission flow are
//! traits ([`LocationProvider`], [`KeyValueStore`], [`NotificationPresenter`],
//! [`PermissionGate`]).
//!
//! # Example Usage
//!
//! ```no_run
//! use location_tracker::{
//!     DetachReason, LocationService, MemoryStore, Notification, NotificationPresenter,
//!     ServiceLifecycleController, SimulatedProvider, SimulationSettings, TrackerConfig,
//! };
//!
//! struct Console;
//!
//! impl NotificationPresenter for Console {
//!     fn show(&mut self, notification: &Notification) {
//!         println!("{}: {}", notification.title, notification.body);
//!     }
//!     fn hide(&mut self) {}
//! }
//!
//! # async fn run() -> location_tracker::Result<()> {
//! let controller = ServiceLifecycleController::new(
//!     SimulatedProvider::new(SimulationSettings::default()),
//!     MemoryStore::new(),
//!     Console,
//!     TrackerConfig::default(),
//! );
//! let (service, task) = LocationService::spawn(controller);
//!
//! service.attach().await?;
//! service.start_tracking().await?;
//! service.detach(DetachReason::Genuine).await?; // notification appears
//!
//! service.stop_tracking().await?;
//! service.shutdown().await?;
//! let _controller = task.await.expect("service task panicked");
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod broadcast;
pub mod client;
pub mod config;
pub mod controller;
pub mod lifecycle;
pub mod notification;
pub mod provider;
pub mod service;
pub mod storage;
pub mod subscription;
pub mod types;

// Re-export main types for convenience
pub use broadcast::{PositionBroadcaster, PositionReceiver, LOCATION_BROADCAST};
pub use client::{PermissionResult, ToggleOutcome, TrackingClient};
pub use config::{LocationRequest, NotificationConfig, Priority, TrackerConfig};
pub use controller::{ServiceLifecycleController, ServiceSnapshot, StartCommand, StopOutcome};
pub use lifecycle::{DetachReason, LifecyclePhase, LifecycleSignal, LifecycleState, Presentation};
pub use notification::{Notification, NotificationAction, NotificationPresenter};
pub use provider::{
    CancelCompleter, CancelHandle, LocationProvider, LocationUpdates, PermissionGate,
    SimulatedProvider, SimulationSettings,
};
pub use service::{LocationService, ServiceCommand, ServiceHandle};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, PreferenceStore, StoredValue};
pub use subscription::{LocationSubscriptionManager, SubscribeOutcome, UnsubscribeOutcome};
pub use types::{
    position_text, Position, RawLocation, Result, Timestamp, TrackerError, UNKNOWN_LOCATION_TEXT,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: defaults match the documented request
        let config = TrackerConfig::default();
        assert_eq!(config.request.interval_ms, 1000);
        assert_eq!(config.request.priority, Priority::HighAccuracy);
    }
}
