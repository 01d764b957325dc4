//! Protocol dispatch.
//!
//! Raw frames are decoded into a [`Command`] first, then matched to their
//! effect:
//!
//! | Command          | Effect              | Sent                                  |
//! |------------------|---------------------|---------------------------------------|
//! | `SetActuator(v)` | store `v`           | `led` event to every session          |
//! | `Echo(msg)`      | none                | `echo` event to the sender only       |
//! | `Unknown`        | none                | nothing                               |
//!
//! Frames that fail to decode are dropped without a reply.

use lumen_protocol::{codec, Command, Event, SessionId};
use tracing::{debug, trace};

use crate::broadcaster::Outbound;
use crate::hub::{CoreError, Hub};
use crate::state::ActuatorState;

/// What handling one inbound frame amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// The actuator was written and the new value broadcast.
    StateChanged(ActuatorState),
    /// An echo reply was sent to the sender.
    Echoed,
    /// Nothing happened: garbage, unknown command, or unknown sender.
    Ignored,
}

impl<O: Outbound> Hub<O> {
    /// Handle a raw frame from a session.
    pub fn on_frame(&mut self, from: SessionId, raw: &[u8]) -> Dispatched {
        if !self.registry.contains(from) {
            debug!(session = %from, "Frame from unregistered session dropped");
            return Dispatched::Ignored;
        }

        match codec::decode(raw) {
            Ok(command) => self.dispatch(from, command),
            Err(e) => {
                debug!(session = %from, error = %e, "Undecodable frame dropped");
                Dispatched::Ignored
            }
        }
    }

    /// Apply a decoded command on behalf of a session.
    pub fn dispatch(&mut self, from: SessionId, command: Command) -> Dispatched {
        trace!(session = %from, command = command.name(), "Dispatch");

        match command {
            Command::SetActuator(value) => {
                let state = self.store.set(value);
                let recipients = self
                    .broadcaster
                    .broadcast(&self.registry, &Event::actuator(state.value));
                debug!(
                    session = %from,
                    value = state.value,
                    version = state.version,
                    recipients,
                    "Actuator set"
                );
                Dispatched::StateChanged(state)
            }
            Command::Echo(msg) => {
                match self.broadcaster.send_to(&self.registry, from, &Event::echo(msg)) {
                    Ok(()) => Dispatched::Echoed,
                    Err(CoreError::UnknownSession(_)) => Dispatched::Ignored,
                    Err(e) => {
                        debug!(session = %from, error = %e, "Echo dropped");
                        Dispatched::Ignored
                    }
                }
            }
            Command::Unknown => {
                trace!(session = %from, "Unknown command dropped");
                Dispatched::Ignored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcaster::tests::RecordingOutbound;
    use crate::state::StateStore;

    fn hub_with(ids: &[u32]) -> (Hub<RecordingOutbound>, RecordingOutbound) {
        let out = RecordingOutbound::default();
        let mut hub = Hub::new(StateStore::new(), out.clone());
        for id in ids {
            hub.registry.register(SessionId(*id));
        }
        (hub, out)
    }

    #[test]
    fn test_led_on_broadcasts_to_everyone() {
        let (mut hub, out) = hub_with(&[0, 1]);

        let outcome = hub.on_frame(SessionId(0), br#"{"cmd":"led","state":"on"}"#);

        assert_eq!(
            outcome,
            Dispatched::StateChanged(ActuatorState {
                value: true,
                version: 1
            })
        );
        let frame = r#"{"event":"led","value":true}"#.to_string();
        assert_eq!(
            out.take(),
            vec![(SessionId(0), frame.clone()), (SessionId(1), frame)]
        );
    }

    #[test]
    fn test_repeated_writes_still_bump_and_broadcast() {
        let (mut hub, out) = hub_with(&[0]);

        for expected in 1..=3 {
            match hub.dispatch(SessionId(0), Command::SetActuator(false)) {
                Dispatched::StateChanged(state) => assert_eq!(state.version, expected),
                other => panic!("Expected StateChanged, got {:?}", other),
            }
        }

        assert_eq!(out.take().len(), 3);
        assert_eq!(hub.state().version, 3);
    }

    #[test]
    fn test_echo_goes_to_sender_only() {
        let (mut hub, out) = hub_with(&[0, 1, 2]);

        let outcome = hub.on_frame(SessionId(1), br#"{"cmd":"echo","msg":"hi"}"#);

        assert_eq!(outcome, Dispatched::Echoed);
        assert_eq!(
            out.take(),
            vec![(SessionId(1), r#"{"event":"echo","msg":"hi"}"#.to_string())]
        );
        assert_eq!(hub.state().version, 0);
    }

    #[test]
    fn test_garbage_is_a_noop() {
        let (mut hub, out) = hub_with(&[0, 1]);

        let frames: [&[u8]; 4] = [b"not-json", b"[]", br#"{"cmd":"dance"}"#, b""];
        for raw in frames {
            assert_eq!(hub.on_frame(SessionId(0), raw), Dispatched::Ignored);
        }

        assert!(out.take().is_empty());
        assert_eq!(hub.state(), ActuatorState::default());
        assert_eq!(hub.registry().len(), 2);
    }

    #[test]
    fn test_frame_from_unregistered_session_is_ignored() {
        let (mut hub, out) = hub_with(&[0]);

        let outcome = hub.on_frame(SessionId(9), br#"{"cmd":"led","state":true}"#);

        assert_eq!(outcome, Dispatched::Ignored);
        assert!(out.take().is_empty());
        assert_eq!(hub.state().version, 0);
    }
}
