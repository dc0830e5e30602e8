//! UI-side client of the location service
//!
//! Mirrors what a screen does with the service: bind on start, register as
//! the position observer while visible, toggle tracking from a single
//! control (asking for permission first when needed), and unbind on stop.

use crate::broadcast::PositionReceiver;
use crate::controller::{ServiceSnapshot, StopOutcome};
use crate::lifecycle::DetachReason;
use crate::provider::PermissionGate;
use crate::service::ServiceHandle;
use crate::types::{Position, Result};

/// Result of pressing the start/stop control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Started,
    Stopped(StopOutcome),
    /// Permission is missing; the grant request is in flight
    PermissionRequested,
    /// The user refused the grant; tracking stays off
    PermissionDenied,
    /// The grant interaction was dismissed without an answer
    Dismissed,
}

/// Answer to a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResult {
    Granted,
    Denied,
    /// The interaction was cancelled before the user answered
    Cancelled,
}

/// Single UI observer of the location service
pub struct TrackingClient<G> {
    service: ServiceHandle,
    gate: G,
    receiver: Option<PositionReceiver>,
    bound_before: bool,
}

impl<G: PermissionGate> TrackingClient<G> {
    pub fn new(service: ServiceHandle, gate: G) -> Self {
        Self {
            service,
            gate,
            receiver: None,
            bound_before: false,
        }
    }

    /// Bind to the service and register for positions
    ///
    /// Returns the service state so the screen can show the cached position
    /// and the control label right away.
    pub async fn connect(&mut self) -> Result<ServiceSnapshot> {
        if self.bound_before {
            self.service.reattach().await?;
        } else {
            self.service.attach().await?;
            self.bound_before = true;
        }
        self.receiver = Some(self.service.register_observer().await?);
        self.service.snapshot().await
    }

    /// Unregister and unbind
    pub async fn disconnect(&mut self, reason: DetachReason) -> Result<()> {
        if self.receiver.take().is_some() {
            self.service.unregister_observer().await?;
        }
        self.service.detach(reason).await
    }

    /// The start/stop control was pressed
    pub async fn toggle(&mut self) -> Result<ToggleOutcome> {
        let snapshot = self.service.snapshot().await?;
        if snapshot.tracking_enabled {
            let outcome = self.service.stop_tracking().await?;
            return Ok(ToggleOutcome::Stopped(outcome));
        }

        if self.gate.is_granted() {
            self.start().await?;
            Ok(ToggleOutcome::Started)
        } else {
            log::debug!("Requesting location permission");
            self.gate.request_grant();
            Ok(ToggleOutcome::PermissionRequested)
        }
    }

    /// The answer to a previous grant request arrived
    pub async fn on_permission_result(&mut self, result: PermissionResult) -> Result<ToggleOutcome> {
        match result {
            PermissionResult::Granted => {
                self.start().await?;
                Ok(ToggleOutcome::Started)
            }
            PermissionResult::Denied => {
                log::info!("Location permission denied");
                Ok(ToggleOutcome::PermissionDenied)
            }
            PermissionResult::Cancelled => {
                log::debug!("Permission interaction was cancelled");
                Ok(ToggleOutcome::Dismissed)
            }
        }
    }

    /// Wait for the next broadcast position
    ///
    /// `None` when not connected, or once the location stream ended; the
    /// next start registers a fresh observer.
    pub async fn next_position(&mut self) -> Option<Position> {
        self.receiver.as_mut()?.recv().await
    }

    async fn start(&mut self) -> Result<()> {
        if self.receiver.is_some() {
            self.receiver = Some(self.service.register_observer().await?);
        }
        self.service.start_tracking().await
    }

    pub fn is_connected(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    pub fn service(&self) -> &ServiceHandle {
        &self.service
    }
}
