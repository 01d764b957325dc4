//! Hub actor.
//!
//! On a multi-threaded runtime the [`Hub`] is owned by one task that drains
//! a queue of [`HubEvent`]s. Connection tasks talk to it through a cloneable
//! [`HubHandle`]. Because the queue is drained one event at a time, every
//! handler runs to completion before the next starts, exactly as on a single
//! threaded event loop.

use bytes::Bytes;
use lumen_protocol::SessionId;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::broadcaster::ChannelOutbound;
use crate::dispatcher::Dispatched;
use crate::hub::{CoreError, Hub};
use crate::state::ActuatorState;

/// Errors seen by users of a [`HubHandle`].
#[derive(Debug, Error)]
pub enum HubError {
    /// The hub task has stopped.
    #[error("Hub is no longer running")]
    Closed,

    /// The hub refused the request.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Work items processed by the hub task, in arrival order.
#[derive(Debug)]
pub enum HubEvent {
    /// A transport connection opened.
    Connect {
        /// Where frames for this session should be queued.
        outbox: mpsc::UnboundedSender<Bytes>,
        /// Receives the assigned id, or the refusal.
        reply: oneshot::Sender<Result<SessionId, CoreError>>,
    },
    /// A transport connection closed.
    Disconnect {
        /// The session that went away.
        id: SessionId,
    },
    /// A text frame arrived.
    Frame {
        /// The sending session.
        id: SessionId,
        /// Raw frame bytes.
        data: Bytes,
    },
    /// Read-only status request.
    Status {
        /// Receives the snapshot.
        reply: oneshot::Sender<HubStatus>,
    },
}

/// Point-in-time view of the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubStatus {
    /// Current actuator state.
    pub state: ActuatorState,
    /// Live sessions, ascending.
    pub sessions: Vec<SessionId>,
}

/// Hub actor settings.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of simultaneous sessions.
    pub max_sessions: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { max_sessions: 8 }
    }
}

/// Cloneable handle to a running hub task.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubEvent>,
}

impl HubHandle {
    /// Register a new connection and get its session id.
    ///
    /// Frames for the session are pushed into `outbox` until
    /// [`HubHandle::disconnect`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the session limit is reached or the hub stopped.
    pub async fn connect(
        &self,
        outbox: mpsc::UnboundedSender<Bytes>,
    ) -> Result<SessionId, HubError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HubEvent::Connect { outbox, reply })
            .map_err(|_| HubError::Closed)?;
        Ok(rx.await.map_err(|_| HubError::Closed)??)
    }

    /// Report a closed connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the hub stopped.
    pub fn disconnect(&self, id: SessionId) -> Result<(), HubError> {
        self.tx
            .send(HubEvent::Disconnect { id })
            .map_err(|_| HubError::Closed)
    }

    /// Forward an inbound frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the hub stopped.
    pub fn frame(&self, id: SessionId, data: Bytes) -> Result<(), HubError> {
        self.tx
            .send(HubEvent::Frame { id, data })
            .map_err(|_| HubError::Closed)
    }

    /// Fetch the current state and session list.
    ///
    /// # Errors
    ///
    /// Returns an error if the hub stopped.
    pub async fn status(&self) -> Result<HubStatus, HubError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HubEvent::Status { reply })
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }
}

/// Spawn the hub task.
///
/// The task ends once every [`HubHandle`] has been dropped.
pub fn spawn(hub: Hub<ChannelOutbound>, config: HubConfig) -> (HubHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(hub, config, rx));
    (HubHandle { tx }, task)
}

async fn run(
    mut hub: Hub<ChannelOutbound>,
    config: HubConfig,
    mut events: mpsc::UnboundedReceiver<HubEvent>,
) {
    info!(max_sessions = config.max_sessions, "Hub started");

    while let Some(event) = events.recv().await {
        handle(&mut hub, &config, event);
    }

    info!("Hub stopped");
}

fn handle(hub: &mut Hub<ChannelOutbound>, config: &HubConfig, event: HubEvent) {
    match event {
        HubEvent::Connect { outbox, reply } => {
            let result = hub.allocate(config.max_sessions);
            if let Ok(id) = result {
                hub.outbound_mut().attach(id, outbox);
                hub.on_connect(id);
            } else {
                warn!(max_sessions = config.max_sessions, "Connection refused");
            }
            if reply.send(result).is_err() {
                debug!("Connect requester went away");
            }
        }
        HubEvent::Disconnect { id } => {
            hub.on_disconnect(id);
            hub.outbound_mut().detach(id);
        }
        HubEvent::Frame { id, data } => {
            if let Dispatched::StateChanged(state) = hub.on_frame(id, &data) {
                debug!(session = %id, version = state.version, "State changed");
            }
        }
        HubEvent::Status { reply } => {
            let status = HubStatus {
                state: hub.state(),
                sessions: hub.registry().list(),
            };
            let _ = reply.send(status);
        }
    }
}
