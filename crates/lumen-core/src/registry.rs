//! Connection registry for Lumen.
//!
//! The registry is the single owner of the set of live sessions. Broadcasts
//! go to exactly the sessions listed here at the time of the call.

use lumen_protocol::SessionId;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// The set of currently connected sessions.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: BTreeSet<SessionId>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session.
    ///
    /// Returns `false` and leaves the registry untouched if the id is
    /// already live.
    pub fn register(&mut self, id: SessionId) -> bool {
        let added = self.sessions.insert(id);
        if added {
            debug!(session = %id, live = self.sessions.len(), "Session registered");
        } else {
            warn!(session = %id, "Session already registered");
        }
        added
    }

    /// Remove a session.
    ///
    /// Returns `false` if the id was not live.
    pub fn unregister(&mut self, id: SessionId) -> bool {
        let removed = self.sessions.remove(&id);
        if removed {
            debug!(session = %id, live = self.sessions.len(), "Session unregistered");
        }
        removed
    }

    /// Snapshot of the live sessions, in ascending id order.
    #[must_use]
    pub fn list(&self) -> Vec<SessionId> {
        self.sessions.iter().copied().collect()
    }

    /// Check whether a session is live.
    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains(&id)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if no session is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Lowest id not currently in use.
    ///
    /// Returns `None` once `limit` sessions are live.
    #[must_use]
    pub fn vacant_id(&self, limit: usize) -> Option<SessionId> {
        if self.sessions.len() >= limit {
            return None;
        }
        (0..=u32::MAX)
            .map(SessionId)
            .find(|id| !self.sessions.contains(id))
    }
}
