//! JSON codec for Lumen envelopes.
//!
//! Inbound frames are decoded leniently: anything that is a JSON object
//! becomes a [`Command`], falling back to defaults for missing or mistyped
//! fields. Outbound events always serialize to the same field set in the
//! same order.

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::envelope::{Command, Event, PresenceKind, SessionId};

/// Maximum inbound frame size (16 KiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024;

/// Text carried by every Hello event.
pub const WELCOME: &str = "welcome";

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds maximum size.
    #[error("Frame size {0} exceeds maximum {MAX_FRAME_SIZE}")]
    FrameTooLarge(usize),

    /// Frame is not a well-formed JSON object.
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Field layout of each outbound event on the wire.
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum WireEvent<'a> {
    Hello {
        who: SessionId,
        msg: &'a str,
    },
    Led {
        value: bool,
    },
    Presence {
        #[serde(rename = "type")]
        kind: PresenceKind,
        who: SessionId,
    },
    Echo {
        msg: &'a str,
    },
}

impl<'a> From<&'a Event> for WireEvent<'a> {
    fn from(event: &'a Event) -> Self {
        match event {
            Event::Hello { who } => WireEvent::Hello {
                who: *who,
                msg: WELCOME,
            },
            Event::ActuatorChanged { value } => WireEvent::Led { value: *value },
            Event::Presence { kind, who } => WireEvent::Presence {
                kind: *kind,
                who: *who,
            },
            Event::EchoReply { msg } => WireEvent::Echo { msg },
        }
    }
}

/// Encode an event to a JSON text frame.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(event: &Event) -> Result<Bytes, ProtocolError> {
    let payload = serde_json::to_vec(&WireEvent::from(event))?;
    Ok(Bytes::from(payload))
}

/// Decode a client frame into a command.
///
/// # Errors
///
/// Returns an error if the frame is too large or is not a JSON object.
pub fn decode(data: &[u8]) -> Result<Command, ProtocolError> {
    if data.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(data.len()));
    }

    let object: Map<String, Value> = serde_json::from_slice(data)?;

    let command = match object.get("cmd").and_then(Value::as_str) {
        Some("led") => Command::SetActuator(requested_state(object.get("state"))),
        Some("echo") => Command::Echo(
            object
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        _ => Command::Unknown,
    };

    Ok(command)
}

/// Interpret the `state` field of a `led` command.
///
/// Booleans are taken as is; the string "on" in any case means on;
/// everything else means off.
fn requested_state(state: Option<&Value>) -> bool {
    match state {
        Some(Value::Bool(on)) => *on,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("on"),
        _ => false,
    }
}
