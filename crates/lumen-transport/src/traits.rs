//! Transport abstraction traits for Lumen.
//!
//! These traits define what the server needs from a transport: accepted
//! connections that deliver and take whole text frames.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Handshake or I/O did not finish in time.
    #[error("Connection timed out")]
    Timeout,

    /// Protocol handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A transport that can accept connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Accept a new raw connection.
    ///
    /// Returns as soon as a peer has connected. The protocol handshake is
    /// left to [`PendingConnection::establish`], so one slow peer cannot
    /// hold up the accept loop.
    async fn accept(&self) -> Result<Box<dyn PendingConnection>, TransportError>;

    /// Get the transport name (e.g., "websocket").
    fn name(&self) -> &'static str;
}

/// An accepted connection whose handshake has not run yet.
#[async_trait]
pub trait PendingConnection: Send {
    /// Run the handshake and return the open connection.
    async fn establish(self: Box<Self>) -> Result<Box<dyn Connection>, TransportError>;

    /// Get the remote address of the peer, if available.
    fn remote_addr(&self) -> Option<String> {
        None
    }
}

/// An open connection carrying text frames.
///
/// `recv` must be cancel safe: the server races it against outbound
/// frames and drops it when an outbound frame wins.
#[async_trait]
pub trait Connection: Send {
    /// Receive the next text frame.
    ///
    /// Returns `None` once the peer has closed the connection.
    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError>;

    /// Send one text frame.
    async fn send_text(&mut self, frame: Bytes) -> Result<(), TransportError>;

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Get the remote address of the connection, if available.
    fn remote_addr(&self) -> Option<String> {
        None
    }

    /// Check if the connection is still open.
    fn is_open(&self) -> bool;
}
