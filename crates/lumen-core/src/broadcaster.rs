//! Outbound delivery for Lumen.
//!
//! The broadcaster encodes events and hands the frames to an [`Outbound`]
//! sink, either for one session or for every registered session. Delivery
//! is fire and forget: nothing waits on a client.

use bytes::Bytes;
use lumen_protocol::{codec, Event, SessionId};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::hub::CoreError;
use crate::registry::ConnectionRegistry;

/// Errors raised by an outbound sink.
#[derive(Debug, Error)]
pub enum OutboundError {
    /// No outbox is attached for the session.
    #[error("No outbox for session {0}")]
    NoOutbox(SessionId),

    /// The session's outbox has been dropped by the transport.
    #[error("Outbox for session {0} is closed")]
    Closed(SessionId),
}

/// The transport's send primitive, as seen by the core.
pub trait Outbound: Send {
    /// Queue an encoded frame for a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot accept frames any more.
    fn send(&self, id: SessionId, frame: Bytes) -> Result<(), OutboundError>;
}

/// An [`Outbound`] backed by one unbounded channel per session.
///
/// The transport side of each channel writes frames to the socket.
#[derive(Debug, Default)]
pub struct ChannelOutbound {
    outboxes: HashMap<SessionId, mpsc::UnboundedSender<Bytes>>,
}

impl ChannelOutbound {
    /// Create an outbound with no sessions attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the outbox for a session, replacing any previous one.
    pub fn attach(&mut self, id: SessionId, outbox: mpsc::UnboundedSender<Bytes>) {
        self.outboxes.insert(id, outbox);
    }

    /// Detach a session's outbox.
    ///
    /// Dropping the sender lets the transport's writer finish.
    pub fn detach(&mut self, id: SessionId) -> bool {
        self.outboxes.remove(&id).is_some()
    }

    /// Number of attached outboxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    /// Check if no outbox is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }
}

impl Outbound for ChannelOutbound {
    fn send(&self, id: SessionId, frame: Bytes) -> Result<(), OutboundError> {
        let outbox = self.outboxes.get(&id).ok_or(OutboundError::NoOutbox(id))?;
        outbox.send(frame).map_err(|_| OutboundError::Closed(id))
    }
}

/// Sends events to registered sessions.
#[derive(Debug)]
pub struct Broadcaster<O> {
    outbound: O,
}

impl<O: Outbound> Broadcaster<O> {
    /// Create a broadcaster over the given sink.
    #[must_use]
    pub fn new(outbound: O) -> Self {
        Self { outbound }
    }

    /// Mutable access to the underlying sink.
    pub fn outbound_mut(&mut self) -> &mut O {
        &mut self.outbound
    }

    /// Send an event to one session.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownSession`] if the session is not
    /// registered. Failures of the sink itself are logged and dropped.
    pub fn send_to(
        &self,
        registry: &ConnectionRegistry,
        id: SessionId,
        event: &Event,
    ) -> Result<(), CoreError> {
        if !registry.contains(id) {
            return Err(CoreError::UnknownSession(id));
        }

        let frame = codec::encode(event)?;
        trace!(session = %id, event = event.tag(), "Sending");
        if let Err(e) = self.outbound.send(id, frame) {
            debug!(session = %id, error = %e, "Dropped outbound frame");
        }
        Ok(())
    }

    /// Send an event to every session registered at call time.
    ///
    /// The event is encoded once. Returns the number of sessions the frame
    /// was handed to.
    pub fn broadcast(&self, registry: &ConnectionRegistry, event: &Event) -> usize {
        let frame = match codec::encode(event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(event = event.tag(), error = %e, "Failed to encode broadcast");
                return 0;
            }
        };

        let recipients = registry.list();
        let mut delivered = 0;
        for id in &recipients {
            match self.outbound.send(*id, frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => debug!(session = %id, error = %e, "Dropped broadcast frame"),
            }
        }

        trace!(
            event = event.tag(),
            recipients = recipients.len(),
            delivered,
            "Broadcast"
        );
        delivered
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Outbound that records every frame as `(session, text)`.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingOutbound {
        pub sent: Arc<Mutex<Vec<(SessionId, String)>>>,
    }

    impl RecordingOutbound {
        pub fn take(&self) -> Vec<(SessionId, String)> {
            std::mem::take(&mut *self.sent.lock().unwrap())
        }
    }

    impl Outbound for RecordingOutbound {
        fn send(&self, id: SessionId, frame: Bytes) -> Result<(), OutboundError> {
            let text = String::from_utf8(frame.to_vec()).expect("frames are UTF-8");
            self.sent.lock().unwrap().push((id, text));
            Ok(())
        }
    }

    fn registry_with(ids: &[u32]) -> ConnectionRegistry {
        let mut registry = ConnectionRegistry::new();
        for id in ids {
            registry.register(SessionId(*id));
        }
        registry
    }

    #[test]
    fn test_send_to_registered_session() {
        let out = RecordingOutbound::default();
        let broadcaster = Broadcaster::new(out.clone());
        let registry = registry_with(&[0, 1]);

        broadcaster
            .send_to(&registry, SessionId(1), &Event::echo("hi"))
            .unwrap();

        assert_eq!(
            out.take(),
            vec![(SessionId(1), r#"{"event":"echo","msg":"hi"}"#.to_string())]
        );
    }

    #[test]
    fn test_send_to_unknown_session() {
        let out = RecordingOutbound::default();
        let broadcaster = Broadcaster::new(out.clone());
        let registry = registry_with(&[0]);

        let result = broadcaster.send_to(&registry, SessionId(5), &Event::echo("hi"));

        assert!(matches!(result, Err(CoreError::UnknownSession(SessionId(5)))));
        assert!(out.take().is_empty());
    }

    #[test]
    fn test_broadcast_reaches_every_registered_session() {
        let out = RecordingOutbound::default();
        let broadcaster = Broadcaster::new(out.clone());
        let registry = registry_with(&[2, 0, 1]);

        let delivered = broadcaster.broadcast(&registry, &Event::actuator(false));

        assert_eq!(delivered, 3);
        let frame = r#"{"event":"led","value":false}"#.to_string();
        assert_eq!(
            out.take(),
            vec![
                (SessionId(0), frame.clone()),
                (SessionId(1), frame.clone()),
                (SessionId(2), frame),
            ]
        );
    }

    #[test]
    fn test_channel_outbound() {
        let mut outbound = ChannelOutbound::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        outbound.attach(SessionId(0), tx);

        outbound.send(SessionId(0), Bytes::from_static(b"x")).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"x"));

        assert!(matches!(
            outbound.send(SessionId(1), Bytes::new()),
            Err(OutboundError::NoOutbox(SessionId(1)))
        ));

        drop(rx);
        assert!(matches!(
            outbound.send(SessionId(0), Bytes::new()),
            Err(OutboundError::Closed(SessionId(0)))
        ));

        assert!(outbound.detach(SessionId(0)));
        assert!(outbound.is_empty());
    }

    #[test]
    fn test_broadcast_skips_closed_outboxes() {
        let mut outbound = ChannelOutbound::new();
        let (tx0, mut rx0) = mpsc::unbounded_channel();
        let (tx1, rx1) = mpsc::unbounded_channel();
        outbound.attach(SessionId(0), tx0);
        outbound.attach(SessionId(1), tx1);
        drop(rx1);

        let broadcaster = Broadcaster::new(outbound);
        let registry = registry_with(&[0, 1]);

        assert_eq!(broadcaster.broadcast(&registry, &Event::actuator(true)), 1);
        assert!(rx0.try_recv().is_ok());
    }
}
