//! Mock collaborators shared by the integration tests

#![allow(dead_code)]

use location_tracker::{
    CancelHandle, LocationProvider, LocationRequest, LocationUpdates, MemoryStore, Notification,
    NotificationPresenter, PermissionGate, RawLocation, Result, ServiceLifecycleController,
    TrackerConfig, TrackerError,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// How the mock source answers a cancellation request
#[derive(Debug, Clone, Copy, Default)]
pub enum CancelBehaviour {
    #[default]
    Confirm,
    Fail,
    ConfirmAfter(Duration),
}

#[derive(Default)]
pub struct ProviderState {
    pub deny: bool,
    pub cancel: CancelBehaviour,
    pub requests: usize,
    pub cancels: usize,
    /// Subscriptions requested and not yet confirmed cancelled
    pub live: usize,
    /// Highest value `live` ever reached
    pub max_live: usize,
    pub sender: Option<mpsc::Sender<RawLocation>>,
}

/// Location source whose state stays inspectable after it is moved
#[derive(Clone, Default)]
pub struct MockProvider {
    pub state: Arc<Mutex<ProviderState>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn denying() -> Self {
        let provider = Self::default();
        provider.state.lock().unwrap().deny = true;
        provider
    }

    pub fn with_cancel(cancel: CancelBehaviour) -> Self {
        let provider = Self::default();
        provider.state.lock().unwrap().cancel = cancel;
        provider
    }

    pub fn set_cancel(&self, cancel: CancelBehaviour) {
        self.state.lock().unwrap().cancel = cancel;
    }

    pub fn requests(&self) -> usize {
        self.state.lock().unwrap().requests
    }

    pub fn live(&self) -> usize {
        self.state.lock().unwrap().live
    }

    pub fn max_live(&self) -> usize {
        self.state.lock().unwrap().max_live
    }

    /// Deliver a fix on the live subscription; false if none is live
    pub async fn push(&self, latitude: f64, longitude: f64) -> bool {
        let sender = self.state.lock().unwrap().sender.clone();
        match sender {
            Some(tx) => tx.send(RawLocation::new(latitude, longitude)).await.is_ok(),
            None => false,
        }
    }

    /// End the live stream from the source side
    pub fn close_stream(&self) {
        let mut state = self.state.lock().unwrap();
        if state.sender.take().is_some() {
            state.live = state.live.saturating_sub(1);
        }
    }
}

fn confirm_cancel(state: &Mutex<ProviderState>) {
    let mut state = state.lock().unwrap();
    state.live = state.live.saturating_sub(1);
    state.sender = None;
}

impl LocationProvider for MockProvider {
    fn request_updates(&mut self, _request: &LocationRequest) -> Result<LocationUpdates> {
        let mut state = self.state.lock().unwrap();
        if state.deny {
            return Err(TrackerError::PermissionDenied("mock denies access".into()));
        }
        state.requests += 1;
        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        let (tx, rx) = mpsc::channel(16);
        state.sender = Some(tx);
        Ok(rx)
    }

    fn cancel(&mut self) -> CancelHandle {
        let behaviour = {
            let mut state = self.state.lock().unwrap();
            state.cancels += 1;
            state.cancel
        };
        match behaviour {
            CancelBehaviour::Confirm => {
                confirm_cancel(&self.state);
                CancelHandle::completed(Ok(()))
            }
            CancelBehaviour::Fail => CancelHandle::completed(Err(
                TrackerError::CancellationFailed("mock refuses".into()),
            )),
            CancelBehaviour::ConfirmAfter(delay) => {
                let (completer, handle) = CancelHandle::pending();
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    confirm_cancel(&state);
                    completer.complete(Ok(()));
                });
                handle
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresenterEvent {
    Show(Notification),
    Hide,
}

/// Notification layer that records every call
#[derive(Clone, Default)]
pub struct RecordingPresenter {
    pub events: Arc<Mutex<Vec<PresenterEvent>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the last call was a show
    pub fn visible(&self) -> bool {
        matches!(
            self.events.lock().unwrap().last(),
            Some(PresenterEvent::Show(_))
        )
    }

    pub fn last_body(&self) -> Option<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|event| match event {
                PresenterEvent::Show(notification) => Some(notification.body.clone()),
                PresenterEvent::Hide => None,
            })
    }

    pub fn show_count(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| matches!(event, PresenterEvent::Show(_)))
            .count()
    }
}

impl NotificationPresenter for RecordingPresenter {
    fn show(&mut self, notification: &Notification) {
        self.events
            .lock()
            .unwrap()
            .push(PresenterEvent::Show(notification.clone()));
    }

    fn hide(&mut self) {
        self.events.lock().unwrap().push(PresenterEvent::Hide);
    }
}

/// Permission flow with a fixed answer
#[derive(Debug, Default)]
pub struct MockGate {
    pub granted: bool,
    pub requests: usize,
}

impl MockGate {
    pub fn granted() -> Self {
        Self {
            granted: true,
            requests: 0,
        }
    }

    pub fn denied() -> Self {
        Self::default()
    }
}

impl PermissionGate for MockGate {
    fn is_granted(&self) -> bool {
        self.granted
    }

    fn request_grant(&mut self) {
        self.requests += 1;
    }
}

pub type TestController = ServiceLifecycleController<MockProvider, MemoryStore, RecordingPresenter>;

/// Controller over fresh mocks, returning clones of the inspectable parts
pub fn controller_with(
    provider: MockProvider,
    store: MemoryStore,
) -> (TestController, MockProvider, RecordingPresenter) {
    init_logging();
    let presenter = RecordingPresenter::new();
    let controller = ServiceLifecycleController::new(
        provider.clone(),
        store,
        presenter.clone(),
        TrackerConfig::default(),
    );
    (controller, provider, presenter)
}

pub fn controller() -> (TestController, MockProvider, RecordingPresenter) {
    controller_with(MockProvider::new(), MemoryStore::new())
}
