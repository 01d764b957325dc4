//! Envelope types for the Lumen protocol.
//!
//! Clients send [`Command`]s, the server answers with [`Event`]s. Both are
//! plain values: they carry no identity beyond their content.

use serde::Serialize;
use std::fmt;

/// Identifier of one connected session.
///
/// Ids are small integers handed out lowest-first and only reused once the
/// session holding them has disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An inbound command decoded from a client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `{"cmd":"led","state":...}`: drive the actuator.
    SetActuator(bool),
    /// `{"cmd":"echo","msg":...}`: reflect text back to the sender.
    Echo(String),
    /// A well-formed object with a missing or unrecognised `cmd`.
    Unknown,
}

impl Command {
    /// Name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetActuator(_) => "led",
            Command::Echo(_) => "echo",
            Command::Unknown => "unknown",
        }
    }
}

/// Which side of a session's lifetime a presence notice announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceKind {
    /// The session connected.
    Join,
    /// The session disconnected.
    Leave,
}

/// An outbound event sent to one or more sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Greeting sent only to a freshly connected session.
    Hello {
        /// The id assigned to the receiving session.
        who: SessionId,
    },
    /// Current actuator value.
    ActuatorChanged {
        /// `true` when the actuator is on.
        value: bool,
    },
    /// A session joined or left.
    Presence {
        /// Join or leave.
        kind: PresenceKind,
        /// The session concerned.
        who: SessionId,
    },
    /// Reply to an echo command.
    EchoReply {
        /// The text that was sent.
        msg: String,
    },
}

impl Event {
    /// Create a Hello event.
    #[must_use]
    pub fn hello(who: SessionId) -> Self {
        Event::Hello { who }
    }

    /// Create an ActuatorChanged event.
    #[must_use]
    pub fn actuator(value: bool) -> Self {
        Event::ActuatorChanged { value }
    }

    /// Create a join notice.
    #[must_use]
    pub fn join(who: SessionId) -> Self {
        Event::Presence {
            kind: PresenceKind::Join,
            who,
        }
    }

    /// Create a leave notice.
    #[must_use]
    pub fn leave(who: SessionId) -> Self {
        Event::Presence {
            kind: PresenceKind::Leave,
            who,
        }
    }

    /// Create an EchoReply event.
    #[must_use]
    pub fn echo(msg: impl Into<String>) -> Self {
        Event::EchoReply { msg: msg.into() }
    }

    /// The `event` tag this envelope is written with.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Event::Hello { .. } => "hello",
            Event::ActuatorChanged { .. } => "led",
            Event::Presence { .. } => "presence",
            Event::EchoReply { .. } => "echo",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tags() {
        assert_eq!(Event::hello(SessionId(0)).tag(), "hello");
        assert_eq!(Event::actuator(true).tag(), "led");
        assert_eq!(Event::leave(SessionId(3)).tag(), "presence");
        assert_eq!(Event::echo("hi").tag(), "echo");
    }

    #[test]
    fn test_session_id_ordering() {
        let mut ids = vec![SessionId(4), SessionId(0), SessionId(2)];
        ids.sort();
        assert_eq!(ids, vec![SessionId(0), SessionId(2), SessionId(4)]);
        assert_eq!(SessionId(7).to_string(), "7");
    }
}
