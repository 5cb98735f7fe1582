//! Async UDP socket pair for talking to the lab.
//!
//! Requests leave from an ephemeral socket connected to the lab's request
//! port; replies arrive on a socket bound to the client port the lab sends
//! to. Every reply is copied into an owned [`RawPacket`] stamped on the
//! session clock, so callers never see the receive buffer.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tracing::trace;

use crate::core::RawPacket;
use crate::core::constants::ECHO_TIMEOUT;
use crate::telemetry::Request;

use super::error::TransportResult;

/// Default receive buffer size.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 65535;

/// Milliseconds elapsed since a session started.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    start: Instant,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionClock {
    /// Start a clock now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Milliseconds since the clock started.
    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// UDP socket pair for one lab session.
#[derive(Debug)]
pub struct LabSocket {
    /// Request socket, connected to the lab.
    tx: Arc<UdpSocket>,
    /// Reply socket, bound to the client port.
    rx: UdpSocket,
    /// Receive buffer.
    recv_buffer: Vec<u8>,
    /// How long `recv_packet` waits before reporting a lost reply.
    recv_timeout: Duration,
    clock: SessionClock,
}

impl LabSocket {
    /// Open a socket pair: replies on `client_addr`, requests to `server_addr`.
    pub async fn open(server_addr: SocketAddr, client_addr: SocketAddr) -> io::Result<Self> {
        LabSocketBuilder::new().open(server_addr, client_addr).await
    }

    /// Set the receive timeout.
    pub fn set_recv_timeout(&mut self, timeout: Duration) {
        self.recv_timeout = timeout;
    }

    /// Get the receive timeout.
    pub fn recv_timeout(&self) -> Duration {
        self.recv_timeout
    }

    /// Address replies are received on.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.rx.local_addr()
    }

    /// Address requests are sent from.
    pub fn request_addr(&self) -> io::Result<SocketAddr> {
        self.tx.local_addr()
    }

    /// Milliseconds since the socket was opened.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Session clock shared by every timestamp this socket produces.
    pub fn clock(&self) -> SessionClock {
        self.clock
    }

    /// Send raw bytes to the lab.
    pub async fn send(&self, data: &[u8]) -> io::Result<usize> {
        self.tx.send(data).await
    }

    /// Send a request to the lab.
    pub async fn send_request(&self, request: &Request) -> TransportResult<usize> {
        trace!(%request, "sending request");
        Ok(self.send(&request.to_bytes()).await?)
    }

    /// Receive one reply of at most `expected_len` bytes.
    ///
    /// Returns `Ok(None)` if nothing arrives within the receive timeout.
    /// Longer datagrams are cut to `expected_len`.
    pub async fn recv_packet(&mut self, expected_len: usize) -> TransportResult<Option<RawPacket>> {
        let recv = self.rx.recv_from(&mut self.recv_buffer);
        let (len, from) = match tokio::time::timeout(self.recv_timeout, recv).await {
            Ok(result) => result?,
            Err(_) => {
                trace!(timeout_ms = self.recv_timeout.as_millis() as u64, "receive timed out");
                return Ok(None);
            }
        };

        let len = len.min(expected_len);
        trace!(%from, len, "received packet");
        Ok(Some(RawPacket::copy_from(
            &self.recv_buffer[..len],
            self.clock.now_ms(),
            expected_len,
        )))
    }

    /// Get a reference to the reply socket.
    pub fn inner(&self) -> &UdpSocket {
        &self.rx
    }
}

/// Builder for creating lab sockets with custom options.
#[derive(Debug, Clone)]
pub struct LabSocketBuilder {
    recv_buffer_size: usize,
    recv_timeout: Duration,
}

impl Default for LabSocketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LabSocketBuilder {
    /// Create a new socket builder with default options.
    pub fn new() -> Self {
        Self {
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            recv_timeout: ECHO_TIMEOUT,
        }
    }

    /// Set the receive buffer size.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Set the receive timeout.
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Bind both sockets and connect the request socket to the lab.
    pub async fn open(self, server_addr: SocketAddr, client_addr: SocketAddr) -> io::Result<LabSocket> {
        let unspecified: SocketAddr = if server_addr.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let tx = UdpSocket::bind(unspecified).await?;
        tx.connect(server_addr).await?;
        let rx = UdpSocket::bind(client_addr).await?;
        Ok(self.from_sockets(tx, rx))
    }

    /// Create a lab socket from existing sockets. `tx` must be connected.
    pub fn from_sockets(self, tx: UdpSocket, rx: UdpSocket) -> LabSocket {
        LabSocket {
            tx: Arc::new(tx),
            rx,
            recv_buffer: vec![0u8; self.recv_buffer_size],
            recv_timeout: self.recv_timeout,
            clock: SessionClock::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fake_lab() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    #[tokio::test]
    async fn test_request_reaches_lab() {
        let lab = fake_lab().await;
        let socket = LabSocket::open(lab.local_addr().unwrap(), "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        let request = Request::Echo {
            code: "1234".into(),
            temperature: false,
        };
        socket.send_request(&request).await.unwrap();

        let mut buf = [0u8; 64];
        let (len, from) = lab.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"echo_request_code=E1234");
        assert_eq!(from.port(), socket.request_addr().unwrap().port());
    }

    #[tokio::test]
    async fn test_reply_copied_into_packet() {
        let lab = fake_lab().await;
        let mut socket = LabSocket::open(lab.local_addr().unwrap(), "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        lab.send_to(&[1, 2, 3], socket.local_addr().unwrap())
            .await
            .unwrap();

        let packet = socket.recv_packet(128).await.unwrap().unwrap();
        assert_eq!(packet.data(), &[1, 2, 3]);
        assert!(packet.is_short());
    }

    #[tokio::test]
    async fn test_long_reply_cut_to_expected_len() {
        let lab = fake_lab().await;
        let mut socket = LabSocket::open(lab.local_addr().unwrap(), "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        lab.send_to(&[7u8; 40], socket.local_addr().unwrap())
            .await
            .unwrap();

        let packet = socket.recv_packet(32).await.unwrap().unwrap();
        assert_eq!(packet.len(), 32);
        assert!(!packet.is_short());
    }

    #[tokio::test]
    async fn test_timeout_is_not_an_error() {
        let lab = fake_lab().await;
        let mut socket = LabSocketBuilder::new()
            .recv_timeout(Duration::from_millis(20))
            .open(lab.local_addr().unwrap(), "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        assert!(socket.recv_packet(32).await.unwrap().is_none());
    }

    #[test]
    fn test_socket_builder() {
        let builder = LabSocketBuilder::new()
            .recv_buffer_size(4096)
            .recv_timeout(Duration::from_millis(500));

        assert_eq!(builder.recv_buffer_size, 4096);
        assert_eq!(builder.recv_timeout, Duration::from_millis(500));
    }
}
