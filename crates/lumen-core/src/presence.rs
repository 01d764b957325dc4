//! Presence notification for Lumen.
//!
//! A connecting session is greeted, given a snapshot of the actuator, and
//! announced to everyone (itself included). A disconnecting session is
//! announced to the sessions that remain.

use lumen_protocol::{Event, SessionId};
use tracing::{debug, info, warn};

use crate::broadcaster::Outbound;
use crate::hub::Hub;

impl<O: Outbound> Hub<O> {
    /// Handle a new connection.
    ///
    /// Returns `false` without sending anything if the id is already live.
    pub fn on_connect(&mut self, id: SessionId) -> bool {
        if !self.registry.register(id) {
            warn!(session = %id, "Duplicate connect ignored");
            return false;
        }

        let snapshot = self.store.get();
        for event in [Event::hello(id), Event::actuator(snapshot.value)] {
            if let Err(e) = self.broadcaster.send_to(&self.registry, id, &event) {
                debug!(session = %id, error = %e, "Greeting dropped");
            }
        }

        let recipients = self.broadcaster.broadcast(&self.registry, &Event::join(id));
        info!(session = %id, live = self.registry.len(), recipients, "Session joined");
        true
    }

    /// Handle a closed connection.
    ///
    /// Returns `false` without sending anything if the id was not live.
    pub fn on_disconnect(&mut self, id: SessionId) -> bool {
        if !self.registry.unregister(id) {
            debug!(session = %id, "Disconnect of unknown session ignored");
            return false;
        }

        let recipients = self.broadcaster.broadcast(&self.registry, &Event::leave(id));
        info!(session = %id, live = self.registry.len(), recipients, "Session left");
        true
    }
}
