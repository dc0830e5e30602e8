//! Location source and permission collaborators
//!
//! The OS location source is modelled as a trait so the subscription manager
//! never depends on a concrete platform API. Updates arrive on a channel;
//! cancellation completes asynchronously through a [`CancelHandle`].

use crate::config::LocationRequest;
use crate::types::{RawLocation, Result, TrackerError};
use tokio::sync::{mpsc, oneshot};

pub mod simulated;

pub use simulated::{SimulatedProvider, SimulationSettings};

/// Stream of raw location events for one live subscription
pub type LocationUpdates = mpsc::Receiver<RawLocation>;

/// Common trait for OS location sources
pub trait LocationProvider: Send {
    /// Start delivering updates according to `request`
    ///
    /// Fails with [`TrackerError::PermissionDenied`] when location permission
    /// was revoked or never granted.
    fn request_updates(&mut self, request: &LocationRequest) -> Result<LocationUpdates>;

    /// Ask the source to stop delivering updates
    ///
    /// The returned handle resolves once the source has confirmed (or
    /// refused) the cancellation.
    fn cancel(&mut self) -> CancelHandle;
}

/// Completion of an asynchronous cancellation request
#[derive(Debug)]
pub struct CancelHandle {
    rx: oneshot::Receiver<Result<()>>,
}

/// Sending half of a [`CancelHandle`], held by the location source
#[derive(Debug)]
pub struct CancelCompleter {
    tx: oneshot::Sender<Result<()>>,
}

impl CancelHandle {
    /// Create a pending handle and the completer that resolves it
    pub fn pending() -> (CancelCompleter, CancelHandle) {
        let (tx, rx) = oneshot::channel();
        (CancelCompleter { tx }, CancelHandle { rx })
    }

    /// Create a handle that is already resolved
    pub fn completed(result: Result<()>) -> Self {
        let (completer, handle) = Self::pending();
        completer.complete(result);
        handle
    }

    /// Wait for the source to report the outcome of the cancellation
    pub async fn completion(self) -> Result<()> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(TrackerError::CancellationFailed(
                "location source dropped the cancellation request".to_string(),
            )),
        }
    }
}

impl CancelCompleter {
    pub fn complete(self, result: Result<()>) {
        // The waiting side may already be gone; nothing left to notify then
        let _ = self.tx.send(result);
    }
}

/// Location permission as seen by the UI
pub trait PermissionGate {
    /// True if while-in-use location access is currently granted
    fn is_granted(&self) -> bool;

    /// Ask the user to grant access; the answer arrives later through
    /// the client's permission-result entry point
    fn request_grant(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_handle_completed() {
        let handle = CancelHandle::completed(Ok(()));
        assert!(handle.completion().await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_handle_pending() {
        let (completer, handle) = CancelHandle::pending();
        tokio::spawn(async move {
            completer.complete(Err(TrackerError::CancellationFailed("busy".into())));
        });

        let result = handle.completion().await;
        assert!(matches!(result, Err(TrackerError::CancellationFailed(_))));
    }

    #[tokio::test]
    async fn test_dropped_completer_is_failure() {
        let (completer, handle) = CancelHandle::pending();
        drop(completer);

        assert!(handle.completion().await.is_err());
    }
}
