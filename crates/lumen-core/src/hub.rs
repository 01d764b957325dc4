//! The Lumen hub.
//!
//! A [`Hub`] owns the connection registry, the state store and the
//! broadcaster. Everything that changes what clients observe goes through
//! `&mut Hub`, so a single owner serializes all handlers. The protocol
//! handlers live in [`crate::dispatcher`] and the connection lifecycle in
//! [`crate::presence`].

use lumen_protocol::{ProtocolError, SessionId};
use thiserror::Error;

use crate::broadcaster::{Broadcaster, Outbound};
use crate::registry::ConnectionRegistry;
use crate::state::{ActuatorState, StateStore};

/// Core errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The session is not registered (for example it raced a disconnect).
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    /// All session slots are in use.
    #[error("Session limit of {0} reached")]
    SessionLimit(usize),

    /// An event could not be encoded.
    #[error("Encoding error: {0}")]
    Encode(#[from] ProtocolError),
}

/// Single owner of the shared actuator state and the live sessions.
#[derive(Debug)]
pub struct Hub<O> {
    pub(crate) registry: ConnectionRegistry,
    pub(crate) store: StateStore,
    pub(crate) broadcaster: Broadcaster<O>,
}

impl<O: Outbound> Hub<O> {
    /// Create a hub around an injected store and sink.
    #[must_use]
    pub fn new(store: StateStore, outbound: O) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            store,
            broadcaster: Broadcaster::new(outbound),
        }
    }

    /// Current actuator state.
    #[must_use]
    pub fn state(&self) -> ActuatorState {
        self.store.get()
    }

    /// The live sessions.
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Mutable access to the outbound sink, for attaching connections.
    pub fn outbound_mut(&mut self) -> &mut O {
        self.broadcaster.outbound_mut()
    }

    /// Reserve the lowest vacant session id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionLimit`] when `limit` sessions are live.
    pub fn allocate(&self, limit: usize) -> Result<SessionId, CoreError> {
        self.registry
            .vacant_id(limit)
            .ok_or(CoreError::SessionLimit(limit))
    }
}
