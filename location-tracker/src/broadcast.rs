//! Position fan-out to the attached UI
//!
//! At most one observer is registered at a time. Registering again replaces
//! the previous observer, and a receiver that was dropped is cleared on the
//! next send. Nothing is queued while no observer is registered: a UI that
//! attaches later reads the cached position instead.

use crate::types::Position;
use tokio::sync::mpsc;

/// Name of the position event, used in logs
pub const LOCATION_BROADCAST: &str = "location_tracker.action.LOCATION_BROADCAST";

/// Single-slot position broadcaster owned by the controller
#[derive(Debug, Default)]
pub struct PositionBroadcaster {
    slot: Option<mpsc::UnboundedSender<Position>>,
}

/// Receiving side handed to the registered observer
#[derive(Debug)]
pub struct PositionReceiver {
    rx: mpsc::UnboundedReceiver<Position>,
}

impl PositionBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the observer, replacing any previous one
    pub fn register(&mut self) -> PositionReceiver {
        if self.has_observer() {
            log::debug!("Replacing {} observer", LOCATION_BROADCAST);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.slot = Some(tx);
        PositionReceiver { rx }
    }

    pub fn unregister(&mut self) {
        if self.slot.take().is_some() {
            log::debug!("{} observer unregistered", LOCATION_BROADCAST);
        }
    }

    pub fn has_observer(&self) -> bool {
        self.slot.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Deliver `position` to the observer; returns false if nobody received it
    pub fn send(&mut self, position: &Position) -> bool {
        let Some(tx) = &self.slot else {
            return false;
        };
        if tx.send(*position).is_err() {
            log::debug!("{} observer went away", LOCATION_BROADCAST);
            self.slot = None;
            return false;
        }
        log::trace!("{} delivered {}", LOCATION_BROADCAST, position);
        true
    }
}

impl PositionReceiver {
    /// Wait for the next position; `None` once unregistered or after the
    /// location stream ended
    pub async fn recv(&mut self) -> Option<Position> {
        self.rx.recv().await
    }

    /// Next position if one is already queued
    pub fn try_recv(&mut self) -> Option<Position> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn position(latitude: f64) -> Position {
        Position::new(latitude, 0.0, Utc::now())
    }

    #[test]
    fn test_send_without_observer() {
        let mut broadcaster = PositionBroadcaster::new();
        assert!(!broadcaster.has_observer());
        assert!(!broadcaster.send(&position(1.0)));
    }

    #[test]
    fn test_registered_observer_receives_in_order() {
        let mut broadcaster = PositionBroadcaster::new();
        let mut rx = broadcaster.register();

        assert!(broadcaster.send(&position(1.0)));
        assert!(broadcaster.send(&position(2.0)));

        assert_eq!(rx.try_recv().unwrap().latitude, 1.0);
        assert_eq!(rx.try_recv().unwrap().latitude, 2.0);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_register_replaces_previous_observer() {
        let mut broadcaster = PositionBroadcaster::new();
        let mut first = broadcaster.register();
        let mut second = broadcaster.register();

        broadcaster.send(&position(3.0));

        assert!(first.try_recv().is_none());
        assert_eq!(second.try_recv().unwrap().latitude, 3.0);
    }

    #[test]
    fn test_dropped_receiver_clears_slot() {
        let mut broadcaster = PositionBroadcaster::new();
        drop(broadcaster.register());

        assert!(!broadcaster.has_observer());
        assert!(!broadcaster.send(&position(1.0)));
    }

    #[tokio::test]
    async fn test_unregister_ends_receiver() {
        let mut broadcaster = PositionBroadcaster::new();
        let mut rx = broadcaster.register();

        broadcaster.unregister();
        assert!(rx.recv().await.is_none());
    }
}
