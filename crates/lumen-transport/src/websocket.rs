//! WebSocket transport implementation.
//!
//! This module provides a WebSocket-based transport using tokio-tungstenite.
//! It listens on its own port, separate from the HTTP page.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message},
    WebSocketStream,
};
use tracing::{debug, error, info, trace, warn};

use crate::traits::{Connection, PendingConnection, Transport, TransportError};

/// WebSocket transport configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum message size in bytes. Larger frames are dropped.
    pub max_message_size: usize,
    /// Time allowed for the opening handshake.
    pub handshake_timeout: Duration,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8081)),
            max_message_size: 4 * 1024, // 4 KB
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

/// WebSocket transport.
pub struct WebSocketTransport {
    listener: TcpListener,
    config: WebSocketConfig,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn new(config: WebSocketConfig) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(TransportError::Io)?;

        info!("WebSocket transport listening on {}", config.bind_addr);

        Ok(Self { listener, config })
    }

    /// Create a new WebSocket transport with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        Self::new(WebSocketConfig {
            bind_addr: addr,
            ..Default::default()
        })
        .await
    }

    /// Get the local address this transport is bound to.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn accept(&self) -> Result<Box<dyn PendingConnection>, TransportError> {
        let (stream, addr) = self.listener.accept().await.map_err(TransportError::Io)?;

        debug!("Accepted TCP connection from {}", addr);

        Ok(Box::new(PendingWebSocket {
            stream,
            remote_addr: addr,
            handshake_timeout: self.config.handshake_timeout,
            max_message_size: self.config.max_message_size,
        }))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// A TCP connection waiting for its WebSocket upgrade.
pub struct PendingWebSocket {
    stream: TcpStream,
    remote_addr: SocketAddr,
    handshake_timeout: Duration,
    max_message_size: usize,
}

#[async_trait]
impl PendingConnection for PendingWebSocket {
    async fn establish(self: Box<Self>) -> Result<Box<dyn Connection>, TransportError> {
        let addr = self.remote_addr;
        let ws_stream = tokio::time::timeout(self.handshake_timeout, accept_async(self.stream))
            .await
            .map_err(|_| {
                warn!("WebSocket handshake with {} timed out", addr);
                TransportError::Timeout
            })?
            .map_err(|e| {
                error!("WebSocket handshake failed: {}", e);
                TransportError::Handshake(e.to_string())
            })?;

        debug!("WebSocket handshake completed with {}", addr);

        let conn = WebSocketConnection::new(ws_stream, addr, self.max_message_size);
        Ok(Box::new(conn))
    }

    fn remote_addr(&self) -> Option<String> {
        Some(self.remote_addr.to_string())
    }
}

/// A WebSocket connection.
pub struct WebSocketConnection {
    stream: WebSocketStream<TcpStream>,
    remote_addr: SocketAddr,
    is_open: bool,
    max_message_size: usize,
}

impl WebSocketConnection {
    fn new(
        stream: WebSocketStream<TcpStream>,
        remote_addr: SocketAddr,
        max_message_size: usize,
    ) -> Self {
        Self {
            stream,
            remote_addr,
            is_open: true,
            max_message_size,
        }
    }

    fn oversized(&self, len: usize) -> bool {
        if len > self.max_message_size {
            warn!(
                "Message too large: {} bytes (max: {})",
                len, self.max_message_size
            );
            return true;
        }
        false
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if self.oversized(text.len()) {
                        continue;
                    }
                    return Ok(Some(Bytes::from(text.into_bytes())));
                }
                Some(Ok(Message::Binary(data))) => {
                    // Accept binary frames as long as they carry UTF-8 text
                    if self.oversized(data.len()) {
                        continue;
                    }
                    match String::from_utf8(data) {
                        Ok(text) => return Ok(Some(Bytes::from(text.into_bytes()))),
                        Err(_) => debug!("Dropping non-UTF-8 binary frame"),
                    }
                }
                Some(Ok(Message::Ping(_))) => {
                    // tungstenite queues the pong and flushes it on the next read
                    trace!("Received ping");
                }
                Some(Ok(Message::Pong(_))) => {
                    // Ignore pong messages
                }
                Some(Ok(Message::Close(_))) => {
                    debug!("Received close frame");
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Ok(Message::Frame(_))) => {
                    // Raw frame, ignore
                }
                Some(Err(WsError::ConnectionClosed)) => {
                    debug!("Connection closed");
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    self.is_open = false;
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    debug!("WebSocket stream ended");
                    self.is_open = false;
                    return Ok(None);
                }
            }
        }
    }

    async fn send_text(&mut self, frame: Bytes) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::ConnectionClosed);
        }

        let text = String::from_utf8(frame.to_vec())
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.is_open {
            return Ok(()); // Already closed
        }
        self.is_open = false;

        self.stream
            .close(None)
            .await
            .map_err(|e| TransportError::SendFailed(format!("Failed to close: {}", e)))
    }

    fn remote_addr(&self) -> Option<String> {
        Some(self.remote_addr.to_string())
    }

    fn is_open(&self) -> bool {
        self.is_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_websocket_config_default() {
        let config = WebSocketConfig::default();
        assert_eq!(config.bind_addr.port(), 8081);
        assert_eq!(config.max_message_size, 4 * 1024);
    }

    async fn listen(config: WebSocketConfig) -> (WebSocketTransport, SocketAddr) {
        let transport = WebSocketTransport::new(WebSocketConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..config
        })
        .await
        .unwrap();
        let addr = transport.local_addr().unwrap();
        (transport, addr)
    }

    async fn loopback(max_message_size: usize) -> (WebSocketTransport, SocketAddr) {
        listen(WebSocketConfig {
            max_message_size,
            ..Default::default()
        })
        .await
    }

    async fn accept_open(transport: &WebSocketTransport) -> Box<dyn Connection> {
        transport.accept().await.unwrap().establish().await.unwrap()
    }

    #[tokio::test]
    async fn test_text_frames_both_ways() {
        let (transport, addr) = loopback(1024).await;

        let client = tokio::spawn(async move {
            let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"cmd":"echo","msg":"hi"}"#.into()))
                .await
                .unwrap();
            let reply = ws.next().await.unwrap().unwrap();
            ws.close(None).await.unwrap();
            reply
        });

        let pending = transport.accept().await.unwrap();
        assert!(pending.remote_addr().is_some());
        let mut conn = pending.establish().await.unwrap();
        assert!(conn.is_open());
        assert!(conn.remote_addr().is_some());

        let frame = conn.recv().await.unwrap().unwrap();
        assert_eq!(&frame[..], br#"{"cmd":"echo","msg":"hi"}"#);

        conn.send_text(Bytes::from_static(br#"{"event":"echo","msg":"hi"}"#))
            .await
            .unwrap();

        // Client closes after reading the reply
        assert!(conn.recv().await.unwrap().is_none());
        assert!(!conn.is_open());

        let reply = client.await.unwrap();
        assert_eq!(reply, Message::Text(r#"{"event":"echo","msg":"hi"}"#.into()));
    }

    #[tokio::test]
    async fn test_oversized_frames_are_skipped() {
        let (transport, addr) = loopback(16).await;

        let client = tokio::spawn(async move {
            let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
                .await
                .unwrap();
            ws.send(Message::Text("x".repeat(64))).await.unwrap();
            ws.send(Message::Binary(b"short".to_vec())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let mut conn = accept_open(&transport).await;
        let frame = conn.recv().await.unwrap().unwrap();
        assert_eq!(&frame[..], b"short");

        client.await.unwrap();
    }

    #[tokio::test]
    async fn test_non_utf8_binary_frames_are_dropped() {
        let (transport, addr) = loopback(1024).await;

        let client = tokio::spawn(async move {
            let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
                .await
                .unwrap();
            ws.send(Message::Binary(vec![0xff, 0xfe, 0x00])).await.unwrap();
            ws.send(Message::Binary(b"{}".to_vec())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let mut conn = accept_open(&transport).await;
        let frame = conn.recv().await.unwrap().unwrap();
        assert_eq!(&frame[..], b"{}");
        assert!(conn.recv().await.unwrap().is_none());

        client.await.unwrap();
    }

    #[tokio::test]
    async fn test_ping_is_answered_with_pong() {
        let (transport, addr) = loopback(1024).await;

        let client = tokio::spawn(async move {
            let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
                .await
                .unwrap();
            ws.send(Message::Ping(b"beat".to_vec())).await.unwrap();
            let reply = ws.next().await.unwrap().unwrap();
            ws.send(Message::Text("done".into())).await.unwrap();
            ws.close(None).await.unwrap();
            reply
        });

        let mut conn = accept_open(&transport).await;
        // The ping is consumed inside recv; the pong goes out while it waits
        let frame = conn.recv().await.unwrap().unwrap();
        assert_eq!(&frame[..], b"done");

        assert_eq!(client.await.unwrap(), Message::Pong(b"beat".to_vec()));
    }

    #[tokio::test]
    async fn test_silent_peer_does_not_block_accept() {
        let (transport, addr) = listen(WebSocketConfig {
            handshake_timeout: Duration::from_secs(3),
            ..Default::default()
        })
        .await;

        // Connects but never sends the upgrade request
        let _silent = tokio::net::TcpStream::connect(addr).await.unwrap();
        let stalled = transport.accept().await.unwrap();

        let client = tokio::spawn(async move {
            tokio_tungstenite::connect_async(format!("ws://{addr}/"))
                .await
                .unwrap()
        });

        let opened = tokio::time::timeout(Duration::from_secs(1), async {
            transport.accept().await.unwrap().establish().await.unwrap()
        })
        .await
        .expect("second handshake must not wait for the silent peer");
        assert!(opened.is_open());
        client.await.unwrap();

        drop(stalled);
    }

    #[tokio::test]
    async fn test_handshake_times_out() {
        let (transport, addr) = listen(WebSocketConfig {
            handshake_timeout: Duration::from_millis(100),
            ..Default::default()
        })
        .await;

        let mut silent = tokio::net::TcpStream::connect(addr).await.unwrap();
        silent.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();

        let pending = transport.accept().await.unwrap();
        let result = pending.establish().await;

        assert!(matches!(result, Err(TransportError::Timeout)));
    }
}
