//! Location subscription manager
//!
//! Owns the single live subscription to the location source and the
//! in-memory last known position. Subscribing twice never creates a second
//! subscription, and the manager only considers itself stopped once the
//! source has confirmed the cancellation.

use crate::config::LocationRequest;
use crate::provider::{LocationProvider, LocationUpdates};
use crate::storage::{KeyValueStore, PreferenceStore};
use crate::types::{Position, RawLocation, Result};

/// Outcome of [`LocationSubscriptionManager::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// A new subscription was requested from the source
    Subscribed,
    /// A subscription was already live; nothing was requested
    AlreadySubscribed,
}

/// Outcome of [`LocationSubscriptionManager::unsubscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    /// The source confirmed the cancellation
    Cancelled,
    /// No subscription was live
    NotSubscribed,
}

enum SubscriptionState {
    Inactive,
    Active { updates: LocationUpdates },
}

/// Mediates exactly one location subscription at a time
pub struct LocationSubscriptionManager<P> {
    provider: P,
    request: LocationRequest,
    state: SubscriptionState,
    last_known: Option<Position>,
}

impl<P: LocationProvider> LocationSubscriptionManager<P> {
    pub fn new(provider: P, request: LocationRequest) -> Self {
        Self {
            provider,
            request,
            state: SubscriptionState::Inactive,
            last_known: None,
        }
    }

    /// Request updates from the source unless a subscription is already live
    ///
    /// On failure (typically [`crate::TrackerError::PermissionDenied`]) the
    /// manager stays inactive.
    pub fn subscribe(&mut self) -> Result<SubscribeOutcome> {
        if self.is_subscribed() {
            log::debug!("Location updates already requested");
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }

        log::debug!(
            "Requesting location updates every {:?} ({:?})",
            self.request.interval(),
            self.request.priority
        );
        let updates = self.provider.request_updates(&self.request)?;
        self.state = SubscriptionState::Active { updates };
        Ok(SubscribeOutcome::Subscribed)
    }

    /// Cancel the live subscription and wait for the source to confirm
    ///
    /// If the source reports failure the subscription is still considered
    /// live and the error is returned; calling again retries the cancel.
    pub async fn unsubscribe(&mut self) -> Result<UnsubscribeOutcome> {
        if !self.is_subscribed() {
            log::debug!("No location updates to remove");
            return Ok(UnsubscribeOutcome::NotSubscribed);
        }

        self.provider.cancel().completion().await?;
        self.state = SubscriptionState::Inactive;
        log::debug!("Location callback removed");
        Ok(UnsubscribeOutcome::Cancelled)
    }

    /// Normalize a raw event, cache it and persist it
    ///
    /// The cache is updated even if persisting fails; the storage error is
    /// returned alongside so the caller can log it.
    pub fn on_update<S: KeyValueStore>(
        &mut self,
        raw: &RawLocation,
        prefs: &mut PreferenceStore<S>,
    ) -> (Position, Result<()>) {
        let position = Position::from_raw(raw);
        if let Some(previous) = &self.last_known {
            if position.captured_at < previous.captured_at {
                log::debug!(
                    "Position captured at {} arrived after one captured at {}",
                    position.captured_at,
                    previous.captured_at
                );
            }
        }
        self.last_known = Some(position);
        let persisted = prefs.save_current_location(&position);
        (position, persisted)
    }

    /// Wait for the next raw event from the live subscription
    ///
    /// Pending forever while inactive. Returns `None` when the source closes
    /// the stream on its own; the manager is inactive afterwards.
    pub async fn next_update(&mut self) -> Option<RawLocation> {
        let SubscriptionState::Active { updates } = &mut self.state else {
            return std::future::pending().await;
        };
        let update = updates.recv().await;
        if update.is_none() {
            log::warn!("Location source closed the update stream");
            self.state = SubscriptionState::Inactive;
        }
        update
    }

    /// Seed the cache, e.g. from storage on process start
    pub fn seed_last_known(&mut self, position: Position) {
        if self.last_known.is_none() {
            self.last_known = Some(position);
        }
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(self.state, SubscriptionState::Active { .. })
    }

    pub fn last_known(&self) -> Option<&Position> {
        self.last_known.as_ref()
    }

    pub fn request(&self) -> &LocationRequest {
        &self.request
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}
