//! Line-oriented TCP link used by the copter autopilot and the vehicle.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::trace;

use crate::telemetry::Request;

use super::error::{TransportError, TransportResult};

/// Request/reply link over one TCP stream.
#[derive(Debug)]
pub struct LineLink {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    terminator: u8,
    line: Vec<u8>,
}

impl LineLink {
    /// Connect to `addr`; replies end at `terminator`.
    pub async fn connect(addr: SocketAddr, terminator: u8) -> TransportResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::from_stream(stream, terminator))
    }

    /// Wrap an existing stream.
    pub fn from_stream(stream: TcpStream, terminator: u8) -> Self {
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer,
            terminator,
            line: Vec::new(),
        }
    }

    /// Send a request.
    pub async fn send_request(&mut self, request: &Request) -> TransportResult<()> {
        trace!(request = %request.to_string().trim_end(), "sending request");
        self.writer.write_all(&request.to_bytes()).await?;
        Ok(())
    }

    /// Read one reply line without its terminator, trimmed of surrounding
    /// whitespace.
    pub async fn read_line(&mut self) -> TransportResult<String> {
        self.line.clear();
        let n = self
            .reader
            .read_until(self.terminator, &mut self.line)
            .await?;
        if n == 0 {
            return Err(TransportError::ConnectionClosed);
        }
        if self.line.last() == Some(&self.terminator) {
            self.line.pop();
        }
        let text = std::str::from_utf8(&self.line).map_err(|_| TransportError::InvalidText)?;
        Ok(text.trim().to_string())
    }

    /// Send a request and read its reply.
    pub async fn exchange(&mut self, request: &Request) -> TransportResult<String> {
        self.send_request(request).await?;
        self.read_line().await
    }
}
