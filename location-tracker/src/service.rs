//! Location service task
//!
//! Runs a [`ServiceLifecycleController`] on a single tokio task. Lifecycle
//! commands from the host and the UI arrive on one queue; position updates
//! arrive from the live subscription. The loop handles one item at a time,
//! so a stop that is waiting for the source to confirm its cancellation
//! holds back every later command, including a new start.
//!
//! ```text
//! ┌──────────────┐                         ┌──────────────────────────┐
//! │ ServiceHandle│── ServiceCommand ─────► │                          │
//! └──────────────┘                         │  LocationService::run    │
//!                                          │  (controller owner)      │
//! ┌──────────────┐                         │                          │
//! │ Location src │── RawLocation ────────► │                          │
//! └──────────────┘                         └────────────┬─────────────┘
//!                                                       │
//!                          ◄──── Position (observer) ───┘
//! ```

use crate::broadcast::PositionReceiver;
use crate::controller::{ServiceLifecycleController, ServiceSnapshot, StartCommand, StopOutcome};
use crate::lifecycle::DetachReason;
use crate::notification::{NotificationAction, NotificationPresenter};
use crate::provider::LocationProvider;
use crate::storage::KeyValueStore;
use crate::types::{Result, TrackerError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Queue depth for pending commands
const COMMAND_QUEUE_SIZE: usize = 32;

/// Messages accepted by the service task
#[derive(Debug)]
pub enum ServiceCommand {
    Attach,
    Reattach,
    Detach(DetachReason),
    ConfigurationChanged,
    StartTracking {
        reply: oneshot::Sender<Result<()>>,
    },
    StopTracking {
        reply: oneshot::Sender<StopOutcome>,
    },
    Start {
        command: StartCommand,
        reply: oneshot::Sender<Option<StopOutcome>>,
    },
    NotificationAction {
        action: NotificationAction,
        reply: oneshot::Sender<Option<StopOutcome>>,
    },
    RegisterObserver {
        reply: oneshot::Sender<PositionReceiver>,
    },
    UnregisterObserver,
    Snapshot {
        reply: oneshot::Sender<ServiceSnapshot>,
    },
    Shutdown,
}

/// Owner of the controller; see the module docs
pub struct LocationService<P, S, N> {
    controller: ServiceLifecycleController<P, S, N>,
    commands: mpsc::Receiver<ServiceCommand>,
}

impl<P, S, N> LocationService<P, S, N>
where
    P: LocationProvider + 'static,
    S: KeyValueStore + 'static,
    N: NotificationPresenter + 'static,
{
    /// Spawn the service task
    ///
    /// The task ends on [`ServiceHandle::shutdown`] or once every handle is
    /// dropped, and yields the controller back for inspection.
    pub fn spawn(
        controller: ServiceLifecycleController<P, S, N>,
    ) -> (ServiceHandle, JoinHandle<ServiceLifecycleController<P, S, N>>) {
        let (tx, commands) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let service = Self {
            controller,
            commands,
        };
        let task = tokio::spawn(service.run());
        (ServiceHandle { tx }, task)
    }

    async fn run(mut self) -> ServiceLifecycleController<P, S, N> {
        log::debug!("Location service task started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(ServiceCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command).await,
                },
                update = self.controller.next_location() => match update {
                    Some(raw) => {
                        self.controller.on_location_result(&raw);
                    }
                    None => self.controller.on_updates_closed(),
                },
            }
        }
        log::debug!("Location service task finished");
        self.controller
    }

    async fn handle(&mut self, command: ServiceCommand) {
        // Reply send failures mean the caller stopped waiting
        match command {
            ServiceCommand::Attach => self.controller.attach(),
            ServiceCommand::Reattach => self.controller.reattach(),
            ServiceCommand::Detach(reason) => self.controller.detach(reason),
            ServiceCommand::ConfigurationChanged => self.controller.configuration_changed(),
            ServiceCommand::StartTracking { reply } => {
                let _ = reply.send(self.controller.start_tracking());
            }
            ServiceCommand::StopTracking { reply } => {
                let _ = reply.send(self.controller.stop_tracking().await);
            }
            ServiceCommand::Start { command, reply } => {
                let _ = reply.send(self.controller.handle_start_command(command).await);
            }
            ServiceCommand::NotificationAction { action, reply } => {
                let _ = reply.send(self.controller.handle_notification_action(action).await);
            }
            ServiceCommand::RegisterObserver { reply } => {
                let _ = reply.send(self.controller.register_observer());
            }
            ServiceCommand::UnregisterObserver => self.controller.unregister_observer(),
            ServiceCommand::Snapshot { reply } => {
                let _ = reply.send(self.controller.snapshot());
            }
            ServiceCommand::Shutdown => {}
        }
    }
}

/// Cloneable handle to a running [`LocationService`]
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<ServiceCommand>,
}

impl ServiceHandle {
    pub async fn attach(&self) -> Result<()> {
        self.send(ServiceCommand::Attach).await
    }

    pub async fn reattach(&self) -> Result<()> {
        self.send(ServiceCommand::Reattach).await
    }

    pub async fn detach(&self, reason: DetachReason) -> Result<()> {
        self.send(ServiceCommand::Detach(reason)).await
    }

    pub async fn configuration_changed(&self) -> Result<()> {
        self.send(ServiceCommand::ConfigurationChanged).await
    }

    pub async fn start_tracking(&self) -> Result<()> {
        self.request(|reply| ServiceCommand::StartTracking { reply })
            .await?
    }

    pub async fn stop_tracking(&self) -> Result<StopOutcome> {
        self.request(|reply| ServiceCommand::StopTracking { reply })
            .await
    }

    /// Deliver a host start command
    pub async fn start_command(&self, command: StartCommand) -> Result<Option<StopOutcome>> {
        self.request(|reply| ServiceCommand::Start { command, reply })
            .await
    }

    /// Deliver a tap on a notification action
    pub async fn notification_action(
        &self,
        action: NotificationAction,
    ) -> Result<Option<StopOutcome>> {
        self.request(|reply| ServiceCommand::NotificationAction { action, reply })
            .await
    }

    pub async fn register_observer(&self) -> Result<PositionReceiver> {
        self.request(|reply| ServiceCommand::RegisterObserver { reply })
            .await
    }

    pub async fn unregister_observer(&self) -> Result<()> {
        self.send(ServiceCommand::UnregisterObserver).await
    }

    pub async fn snapshot(&self) -> Result<ServiceSnapshot> {
        self.request(|reply| ServiceCommand::Snapshot { reply })
            .await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(ServiceCommand::Shutdown).await
    }

    async fn send(&self, command: ServiceCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| TrackerError::ServiceStopped)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ServiceCommand,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await.map_err(|_| TrackerError::ServiceStopped)
    }
}
