//! # lumen-transport
//!
//! Transport layer for the Lumen actuator server.
//!
//! A transport accepts connections and turns them into a stream of text
//! frames. The server bridges each [`Connection`] to the hub without knowing
//! which protocol carries it.
//!
//! - **WebSocket** - Plain `ws://` on its own port (feature `websocket`)
//!
//! ```rust,ignore
//! use lumen_transport::{Connection, Transport};
//!
//! async fn handle_connection(mut conn: Box<dyn Connection>) {
//!     while let Ok(Some(frame)) = conn.recv().await {
//!         // Process frame
//!     }
//! }
//! ```

pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use traits::{Connection, PendingConnection, Transport, TransportError};

#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConfig, WebSocketTransport};
