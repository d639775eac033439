//! Server lifecycle state machine.
//!
//! # States
//! ```text
//! Stopped  ──port emitted──▶ Starting ──bound──▶ Running
//! Running  ──port emitted──▶ Starting            (full stop, then start)
//! Starting ──port busy / start error──▶ Failed   (lifecycle terminates)
//! any      ──shutdown──▶ Stopped
//! ```
//!
//! # Invariants
//! - At most one live server instance; the previous one is fully stopped
//!   before the next bind
//! - Only the manager writes the server slot
//! - Failures are never retried; the control plane shuts itself down

use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use crate::agent::rules::EPHEMERAL_SUBSCRIPTION_ID;
use crate::agent::{Collaborators, Notice};
use crate::api::ApiState;
use crate::config::{PortFeed, PortSubscription, SharedConfig};
use crate::http::{HttpServer, ServerError, ServerHandle};
use crate::lifecycle::shutdown::Shutdown;
use crate::net::{is_port_available, local_network_addresses};
use crate::observability::metrics;

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting { port: u16 },
    Running { port: u16 },
    Failed { port: u16 },
}

/// Why the lifecycle terminated.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("port {0} is already in use")]
    PortBusy(u16),
    #[error("failed to start server on port {port}: {source}")]
    Start {
        port: u16,
        #[source]
        source: ServerError,
    },
    #[error("lifecycle task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// Published status, written only by the manager.
struct Status {
    running: watch::Sender<bool>,
    state: watch::Sender<LifecycleState>,
    local_addresses: watch::Sender<Vec<IpAddr>>,
    label: watch::Sender<Option<String>>,
}

impl Status {
    fn new() -> Self {
        Self {
            running: watch::channel(false).0,
            state: watch::channel(LifecycleState::Stopped).0,
            local_addresses: watch::channel(Vec::new()).0,
            label: watch::channel(None).0,
        }
    }
}

/// Read-only view of the control plane's status.
#[derive(Clone)]
pub struct StatusWatch {
    status: Arc<Status>,
}

impl StatusWatch {
    /// `true` while the control plane is alive.
    pub fn is_running(&self) -> bool {
        *self.status.running.borrow()
    }

    pub fn running(&self) -> watch::Receiver<bool> {
        self.status.running.subscribe()
    }

    pub fn state(&self) -> LifecycleState {
        *self.status.state.borrow()
    }

    pub fn states(&self) -> watch::Receiver<LifecycleState> {
        self.status.state.subscribe()
    }

    /// LAN addresses computed when the control plane started.
    pub fn local_addresses(&self) -> Vec<IpAddr> {
        self.status.local_addresses.borrow().clone()
    }

    /// Status label of the current server instance.
    pub fn label(&self) -> Option<String> {
        self.status.label.borrow().clone()
    }

    /// Wait until the state satisfies `pred`.
    pub async fn wait_for(&self, pred: impl FnMut(&LifecycleState) -> bool) -> LifecycleState {
        let mut rx = self.states();
        let state = match rx.wait_for(pred).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        state
    }
}

/// Owner of the single server slot.
pub struct LifecycleManager {
    agent: Collaborators,
    config: SharedConfig,
    slot: Mutex<Option<ServerHandle>>,
    status: Arc<Status>,
}

impl LifecycleManager {
    pub fn new(agent: Collaborators, config: SharedConfig) -> Self {
        Self {
            agent,
            config,
            slot: Mutex::new(None),
            status: Arc::new(Status::new()),
        }
    }

    pub fn status(&self) -> StatusWatch {
        StatusWatch {
            status: self.status.clone(),
        }
    }

    /// Address of the live server instance, if any.
    pub async fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.slot.lock().await.as_ref().map(ServerHandle::local_addr)
    }

    /// Consume port emissions until shutdown or failure.
    pub async fn run(
        &self,
        mut ports: PortSubscription,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), LifecycleError> {
        self.status.running.send_replace(true);
        self.status
            .local_addresses
            .send_replace(local_network_addresses());
        self.agent.notifier.notify(Notice::Started);
        tracing::info!("Control plane started");

        let outcome = loop {
            tokio::select! {
                _ = shutdown.recv() => break Ok(()),
                next = ports.next() => match next {
                    Some(port) => {
                        if let Err(e) = self.apply(port).await {
                            break Err(e);
                        }
                    }
                    None => break Ok(()),
                },
            }
        };

        let final_state = match &outcome {
            Ok(()) => LifecycleState::Stopped,
            Err(LifecycleError::PortBusy(port)) | Err(LifecycleError::Start { port, .. }) => {
                LifecycleState::Failed { port: *port }
            }
            Err(LifecycleError::Aborted(_)) => LifecycleState::Stopped,
        };
        self.teardown(final_state).await;
        outcome
    }

    /// Stop-then-start for one emitted port.
    async fn apply(&self, port: u16) -> Result<(), LifecycleError> {
        self.status.state.send_replace(LifecycleState::Starting { port });
        self.stop_server().await;

        if !is_port_available(port) {
            tracing::warn!(port, "Port unavailable, shutting down control plane");
            self.agent.notifier.notify(Notice::PortBusy { port });
            return Err(LifecycleError::PortBusy(port));
        }

        let server = HttpServer::new(ApiState {
            agent: self.agent.clone(),
            config: self.config.clone(),
        });
        let handle = match server.start(port).await {
            Ok(handle) => handle,
            Err(source) => {
                tracing::error!(port, error = %source, "Server failed to start");
                self.agent.notifier.notify(Notice::StartFailed {
                    port,
                    reason: source.to_string(),
                });
                return Err(LifecycleError::Start { port, source });
            }
        };

        *self.slot.lock().await = Some(handle);
        metrics::record_restart(port);

        let notice = Notice::Listening { port };
        self.status.label.send_replace(Some(notice.to_string()));
        self.status.state.send_replace(LifecycleState::Running { port });
        self.agent.notifier.notify(notice);
        Ok(())
    }

    /// Stop the live instance, if any, and clear the slot.
    async fn stop_server(&self) {
        let previous = self.slot.lock().await.take();
        if let Some(handle) = previous {
            let port = handle.port();
            if let Err(e) = handle.stop().await {
                tracing::warn!(port, error = %e, "Server did not stop cleanly");
            }
        }
    }

    async fn teardown(&self, final_state: LifecycleState) {
        self.stop_server().await;

        if self.config.load().server.clear_ephemeral_on_exit {
            if let Err(e) = self.agent.rules.delete_subscription(EPHEMERAL_SUBSCRIPTION_ID).await {
                tracing::warn!(error = %e, "Failed to clear ephemeral subscription");
            }
        }

        self.status.label.send_replace(None);
        self.status.state.send_replace(final_state);
        self.status.running.send_replace(false);
        self.agent.notifier.notify(Notice::Stopped);
        tracing::info!(state = ?final_state, "Control plane stopped");
    }
}

/// A running control plane: the lifecycle task plus its shutdown switch.
pub struct ControlPlane {
    manager: Arc<LifecycleManager>,
    shutdown: Shutdown,
    task: JoinHandle<Result<(), LifecycleError>>,
}

impl ControlPlane {
    /// Spawn the lifecycle task observing `ports`.
    pub fn start(agent: Collaborators, config: SharedConfig, ports: &PortFeed) -> Self {
        let manager = Arc::new(LifecycleManager::new(agent, config));
        let shutdown = Shutdown::new();

        let subscription = ports.subscribe();
        let signal = shutdown.subscribe();
        let runner = manager.clone();
        let task = tokio::spawn(async move { runner.run(subscription, signal).await });

        Self {
            manager,
            shutdown,
            task,
        }
    }

    pub fn status(&self) -> StatusWatch {
        self.manager.status()
    }

    pub async fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.manager.local_addr().await
    }

    /// Whether the lifecycle task has ended on its own.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Request shutdown and wait for the lifecycle to end.
    pub async fn stop(self) -> Result<(), LifecycleError> {
        self.shutdown.trigger();
        self.task.await?
    }

    /// Wait for the lifecycle to end without requesting it.
    pub async fn wait(self) -> Result<(), LifecycleError> {
        self.task.await?
    }
}
