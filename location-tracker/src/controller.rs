//! Service lifecycle controller
//!
//! Ties the lifecycle state machine to its collaborators. Lifecycle signals
//! and start/stop requests enter here; the controller drives the
//! subscription manager, persists the tracking flag, shows or hides the
//! foreground notification, and fans positions out to the attached UI.
//!
//! All methods take `&mut self`: the controller is meant to be driven from a
//! single task (see [`crate::service`]), so no update can interleave with a
//! subscribe or an unsubscribe.

use crate::broadcast::{PositionBroadcaster, PositionReceiver};
use crate::config::{NotificationConfig, TrackerConfig};
use crate::lifecycle::{
    DetachReason, LifecyclePhase, LifecycleSignal, LifecycleState, Presentation, Transition,
};
use crate::notification::{Notification, NotificationAction, NotificationPresenter};
use crate::provider::LocationProvider;
use crate::storage::{KeyValueStore, PreferenceStore};
use crate::subscription::{LocationSubscriptionManager, UnsubscribeOutcome};
use crate::types::{position_text, Position, RawLocation, Result};
use chrono::Utc;

/// Outcome of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The source confirmed the cancellation; the host was asked to stop
    Stopped,
    /// Nothing was subscribed; the flag was cleared and the host asked to stop
    AlreadyStopped,
    /// The source did not confirm; tracking stays on and the host keeps running
    CancellationFailed,
}

impl StopOutcome {
    pub fn is_stopped(self) -> bool {
        !matches!(self, StopOutcome::CancellationFailed)
    }
}

/// Start command delivered by the host
///
/// Commands are not sticky: after the process is killed the host must not
/// redeliver them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartCommand {
    /// Set when the command comes from the notification's cancel action
    pub cancel_from_notification: bool,
}

impl StartCommand {
    pub fn cancel_from_notification() -> Self {
        Self {
            cancel_from_notification: true,
        }
    }
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSnapshot {
    pub phase: LifecyclePhase,
    /// Persisted tracking flag
    pub tracking_enabled: bool,
    /// True while a location subscription is live
    pub subscribed: bool,
    pub notification_visible: bool,
    /// True if the host may tear the process down
    pub teardown_allowed: bool,
    /// True once a confirmed stop asked the host to stop the service
    pub stop_requested: bool,
    pub last_position: Option<Position>,
    /// Text the UI or the notification would display
    pub location_text: String,
}

/// Lifecycle controller for the location service
pub struct ServiceLifecycleController<P, S, N> {
    subscriptions: LocationSubscriptionManager<P>,
    prefs: PreferenceStore<S>,
    presenter: N,
    broadcaster: PositionBroadcaster,
    lifecycle: LifecycleState,
    notification_config: NotificationConfig,
    /// Service was explicitly started and may be promoted to foreground
    started: bool,
    stop_requested: bool,
    notification_visible: bool,
}

impl<P, S, N> ServiceLifecycleController<P, S, N>
where
    P: LocationProvider,
    S: KeyValueStore,
    N: NotificationPresenter,
{
    pub fn new(provider: P, store: S, presenter: N, config: TrackerConfig) -> Self {
        Self {
            subscriptions: LocationSubscriptionManager::new(provider, config.request),
            prefs: PreferenceStore::new(store),
            presenter,
            broadcaster: PositionBroadcaster::new(),
            lifecycle: LifecycleState::new(),
            notification_config: config.notification,
            started: false,
            stop_requested: false,
            notification_visible: false,
        }
    }

    /// Reconcile with persisted state on process start
    ///
    /// The last stored position seeds the cache. If tracking is persisted as
    /// enabled the subscription is re-established; as no UI is attached yet
    /// the service comes up promoted to foreground. A permission failure
    /// clears the flag and is returned.
    pub fn restore(&mut self) -> Result<bool> {
        if let Some(position) = self.prefs.current_position(Utc::now()) {
            self.subscriptions.seed_last_known(position);
        }

        if !self.prefs.location_tracking() {
            log::debug!("Tracking disabled in preferences, nothing to restore");
            return Ok(false);
        }

        log::info!("Restoring location tracking from preferences");
        self.start_tracking()?;
        Ok(true)
    }

    /// A UI client bound for the first time
    pub fn attach(&mut self) {
        log::debug!("attach()");
        self.signal(LifecycleSignal::Attach);
    }

    /// A UI client came back after detaching
    pub fn reattach(&mut self) {
        log::debug!("reattach()");
        self.signal(LifecycleSignal::Reattach);
    }

    /// The host reported a configuration change; the next detach is transient
    pub fn configuration_changed(&mut self) {
        log::debug!("configuration_changed()");
        self.signal(LifecycleSignal::ConfigurationChanged);
    }

    pub fn detach(&mut self, reason: DetachReason) {
        log::debug!("detach({:?})", reason);
        self.signal(LifecycleSignal::Detach(reason));
    }

    /// Persist `enabled = true` and subscribe
    ///
    /// On failure the flag is rolled back to false and the error returned;
    /// the phase does not change.
    pub fn start_tracking(&mut self) -> Result<()> {
        log::debug!("start_tracking()");
        self.prefs.save_location_tracking(true)?;
        self.started = true;
        self.stop_requested = false;

        if let Err(e) = self.subscriptions.subscribe() {
            log::error!("Couldn't request location updates: {}", e);
            self.started = false;
            if let Err(storage) = self.prefs.save_location_tracking(false) {
                log::warn!("Failed to roll back tracking flag: {}", storage);
            }
            return Err(e);
        }

        log::info!("Location tracking started");
        self.signal(LifecycleSignal::TrackingChanged(true));
        Ok(())
    }

    /// Unsubscribe and, once the source confirms, persist `enabled = false`
    /// and ask the host to stop
    pub async fn stop_tracking(&mut self) -> StopOutcome {
        log::debug!("stop_tracking()");
        let outcome = match self.subscriptions.unsubscribe().await {
            Ok(UnsubscribeOutcome::Cancelled) => StopOutcome::Stopped,
            Ok(UnsubscribeOutcome::NotSubscribed) => StopOutcome::AlreadyStopped,
            Err(e) => {
                log::warn!("Failed to remove location callback: {}", e);
                return StopOutcome::CancellationFailed;
            }
        };

        if let Err(e) = self.prefs.save_location_tracking(false) {
            log::warn!("Failed to persist tracking flag: {}", e);
        }
        self.started = false;
        self.stop_requested = true;
        log::info!("Location tracking stopped, requesting service stop");
        self.signal(LifecycleSignal::TrackingChanged(false));
        outcome
    }

    /// Stop requested from the notification's cancel action
    pub async fn cancel_from_notification(&mut self) -> StopOutcome {
        log::info!("Tracking cancelled from notification");
        self.stop_tracking().await
    }

    /// Route a notification action; only `Cancel` affects the service
    pub async fn handle_notification_action(
        &mut self,
        action: NotificationAction,
    ) -> Option<StopOutcome> {
        match action {
            NotificationAction::Cancel => Some(self.cancel_from_notification().await),
            NotificationAction::Launch => {
                log::debug!("Launch action, waiting for the UI to attach");
                None
            }
        }
    }

    /// Handle a start command from the host
    pub async fn handle_start_command(&mut self, command: StartCommand) -> Option<StopOutcome> {
        log::debug!("handle_start_command({:?})", command);
        if command.cancel_from_notification {
            Some(self.cancel_from_notification().await)
        } else {
            None
        }
    }

    /// Normalize, cache, persist and fan out one raw event
    pub fn on_location_result(&mut self, raw: &RawLocation) -> Position {
        let (position, persisted) = self.subscriptions.on_update(raw, &mut self.prefs);
        if let Err(e) = persisted {
            log::warn!("Failed to persist position {}: {}", position, e);
        }
        self.on_position_update(&position);
        position
    }

    /// Fan out a position that the subscription manager has already cached
    /// and persisted: broadcast to the observer, refresh the notification
    /// when promoted
    pub fn on_position_update(&mut self, position: &Position) {
        self.broadcaster.send(position);

        if self.lifecycle.phase() == LifecyclePhase::DetachedForeground {
            let notification = Notification::for_position(Some(position), &self.notification_config);
            self.presenter.show(&notification);
            self.notification_visible = true;
        }
    }

    /// The source ended the stream on its own
    ///
    /// Tracking is persisted as disabled and the observer slot is closed, so
    /// a waiting observer sees the end of its stream after any queued
    /// positions.
    pub fn on_updates_closed(&mut self) {
        log::warn!("Location updates ended, disabling tracking");
        self.broadcaster.unregister();
        if let Err(e) = self.prefs.save_location_tracking(false) {
            log::warn!("Failed to persist tracking flag: {}", e);
        }
        self.started = false;
        self.signal(LifecycleSignal::TrackingChanged(false));
    }

    /// Wait for the next raw event; pending forever while unsubscribed
    pub async fn next_location(&mut self) -> Option<RawLocation> {
        self.subscriptions.next_update().await
    }

    /// Register the UI as the position observer, replacing any previous one
    pub fn register_observer(&mut self) -> PositionReceiver {
        self.broadcaster.register()
    }

    pub fn unregister_observer(&mut self) {
        self.broadcaster.unregister();
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.lifecycle.phase()
    }

    /// Persisted tracking flag
    pub fn tracking_enabled(&self) -> bool {
        self.prefs.location_tracking()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscriptions.is_subscribed()
    }

    pub fn notification_visible(&self) -> bool {
        self.notification_visible
    }

    /// True if nothing keeps the service alive: no UI, no subscription,
    /// not started
    pub fn teardown_allowed(&self) -> bool {
        self.phase() == LifecyclePhase::Detached && !self.started && !self.is_subscribed()
    }

    pub fn last_known_position(&self) -> Option<&Position> {
        self.subscriptions.last_known()
    }

    pub fn presenter(&self) -> &N {
        &self.presenter
    }

    pub fn preferences(&self) -> &PreferenceStore<S> {
        &self.prefs
    }

    pub fn provider(&self) -> &P {
        self.subscriptions.provider()
    }

    pub fn snapshot(&self) -> ServiceSnapshot {
        let last_position = self.last_known_position().copied();
        ServiceSnapshot {
            phase: self.phase(),
            tracking_enabled: self.tracking_enabled(),
            subscribed: self.is_subscribed(),
            notification_visible: self.notification_visible,
            teardown_allowed: self.teardown_allowed(),
            stop_requested: self.stop_requested,
            last_position,
            location_text: position_text(last_position.as_ref()),
        }
    }

    fn signal(&mut self, signal: LifecycleSignal) {
        let transition = self.lifecycle.apply(signal, self.tracking_enabled());
        if transition.changed() {
            log::debug!("Lifecycle {} -> {}", transition.from, transition.to);
        }
        self.present(transition);
    }

    fn present(&mut self, transition: Transition) {
        match transition.presentation {
            Presentation::Show => {
                log::info!("Promoting service to foreground");
                let notification = Notification::for_position(
                    self.subscriptions.last_known(),
                    &self.notification_config,
                );
                self.presenter.show(&notification);
                self.notification_visible = true;
            }
            Presentation::Hide => {
                if self.notification_visible {
                    log::info!("Leaving foreground");
                }
                self.presenter.hide();
                self.notification_visible = false;
            }
            Presentation::Unchanged => {}
        }
    }
}
