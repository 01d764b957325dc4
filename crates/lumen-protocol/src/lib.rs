//! # lumen-protocol
//!
//! Wire protocol definitions for the Lumen actuator server.
//!
//! Clients and server exchange small JSON objects over WebSocket text
//! frames. Clients send commands tagged by `cmd`, the server replies with
//! events tagged by `event`.
//!
//! ## Envelopes
//!
//! - `{"cmd":"led","state":true|false|"on"|"off"}` - Drive the actuator
//! - `{"cmd":"echo","msg":"..."}` - Echo text back to the sender
//! - `{"event":"hello","who":0,"msg":"welcome"}` - Greeting for new sessions
//! - `{"event":"led","value":true}` - Current actuator value
//! - `{"event":"presence","type":"join"|"leave","who":0}` - Presence notices
//! - `{"event":"echo","msg":"..."}` - Echo reply
//!
//! ## Example
//!
//! ```rust
//! use lumen_protocol::{codec, Command, Event};
//!
//! let command = codec::decode(br#"{"cmd":"led","state":"on"}"#).unwrap();
//! assert_eq!(command, Command::SetActuator(true));
//!
//! let frame = codec::encode(&Event::actuator(true)).unwrap();
//! assert_eq!(&frame[..], br#"{"event":"led","value":true}"#);
//! ```

pub mod codec;
pub mod envelope;

pub use codec::{decode, encode, ProtocolError, MAX_FRAME_SIZE};
pub use envelope::{Command, Event, PresenceKind, SessionId};
