//! High-level lab client.
//!
//! One [`LabClient`] owns the UDP socket pair for a session code and runs the
//! lab's operations end to end: it sends the request, collects the replies,
//! and feeds them through the decoders and estimators. Lost or undecodable
//! replies are logged and skipped; only socket failures abort an operation.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, info, trace, warn};

use crate::codec::{AqDpcmDecoder, AqDpcmStream, DpcmDecoder, DpcmStream};
use crate::core::constants::{AQ_DPCM_PACKET_LEN, DPCM_PACKET_LEN, ECHO_REPLY_LEN, INITIATE_ECHOES};
use crate::core::{LabError, PacketDecoder};
use crate::estimate::{EchoRecorder, EchoReport, RoundTripTimer};
use crate::telemetry::vehicle::parse_reply;
use crate::telemetry::{
    CopterReading, ImageAssembler, Request, SoundSource, VehicleParameter, VehicleReading,
};
use crate::transport::{LabSocket, LabSocketBuilder, LineLink, TransportError};

use super::config::LabConfig;

/// Largest copter telemetry line.
const COPTER_LINE_MAX: usize = 256;

/// Client for one lab session.
///
/// # Example
///
/// ```no_run
/// use ithaki_telemetry::client::{LabClient, LabConfig};
///
/// # async fn run() -> Result<(), ithaki_telemetry::LabError> {
/// let mut client = LabClient::connect(LabConfig::from_env()?).await?;
/// client.initiate("1234").await?;
/// let report = client.echo_session("1234", false, None).await?;
/// println!("{} replies", report.rtt.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LabClient {
    config: LabConfig,
    socket: LabSocket,
}

impl LabClient {
    /// Resolve the lab and open the socket pair.
    pub async fn connect(config: LabConfig) -> Result<Self, LabError> {
        let server_addr = resolve(&config.host, config.server_port).await?;
        let client_addr = unspecified(server_addr, config.client_port);
        let socket = LabSocketBuilder::new()
            .recv_timeout(config.echo_timeout)
            .open(server_addr, client_addr)
            .await
            .map_err(TransportError::from)?;

        info!(%server_addr, client_port = config.client_port, "lab client ready");
        Ok(Self::with_socket(config, socket))
    }

    /// Use an already opened socket pair.
    pub fn with_socket(config: LabConfig, socket: LabSocket) -> Self {
        Self { config, socket }
    }

    /// Client configuration.
    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    /// Underlying socket pair.
    pub fn socket(&self) -> &LabSocket {
        &self.socket
    }

    /// Open the session with a burst of echo requests.
    ///
    /// Returns how many were answered.
    pub async fn initiate(&mut self, code: &str) -> Result<usize, LabError> {
        let request = Request::Echo {
            code: code.to_string(),
            temperature: false,
        };
        self.socket.set_recv_timeout(self.config.echo_timeout);

        let mut answered = 0;
        for _ in 0..INITIATE_ECHOES {
            self.socket.send_request(&request).await?;
            match self.socket.recv_packet(ECHO_REPLY_LEN).await? {
                Some(packet) => {
                    answered += 1;
                    debug!(reply = %String::from_utf8_lossy(packet.data()), "initiate reply");
                }
                None => warn!("initiate echo timed out"),
            }
        }
        Ok(answered)
    }

    /// Send echo requests back to back for `duration` (the configured
    /// session length if `None`) and measure round trips and throughput.
    pub async fn echo_session(
        &mut self,
        code: &str,
        temperature: bool,
        duration: Option<Duration>,
    ) -> Result<EchoReport, LabError> {
        let request = Request::Echo {
            code: code.to_string(),
            temperature,
        };
        let reply_len = request.reply_len().unwrap_or(ECHO_REPLY_LEN);
        let duration = duration.unwrap_or(self.config.echo_session);
        self.socket.set_recv_timeout(self.config.echo_timeout);

        let start_ms = self.socket.now_ms();
        let end_ms = start_ms.saturating_add(duration.as_millis() as u64);
        let mut recorder = EchoRecorder::reference(start_ms);
        let mut timer = RoundTripTimer::new();

        while self.socket.now_ms() < end_ms {
            timer.on_send(self.socket.now_ms());
            self.socket.send_request(&request).await?;
            recorder.on_sent();

            match self.socket.recv_packet(reply_len).await? {
                Some(packet) => {
                    let at = packet.received_at_ms();
                    let rtt = timer.on_receive(at).unwrap_or_default();
                    let sample = recorder.on_reply(at, rtt, packet.len() as u64);
                    trace!(rtt_ms = rtt, srtt = sample.srtt, rto = sample.rto, "echo reply");
                }
                None => {
                    timer.clear_pending();
                    recorder.on_lost();
                    debug!("echo timed out");
                }
            }
        }

        let report = recorder.finish();
        info!(
            sent = report.sent,
            lost = report.lost,
            rates = report.throughput.len(),
            "echo session finished"
        );
        Ok(report)
    }

    /// Stream `packets` DPCM packets and decode them.
    pub async fn dpcm_session(
        &mut self,
        code: &str,
        source: SoundSource,
        packets: u32,
    ) -> Result<DpcmStream, LabError> {
        let request = Request::Sound {
            code: code.to_string(),
            source,
            packets,
        };
        self.socket.set_recv_timeout(self.config.audio_timeout);
        self.socket.send_request(&request).await?;

        let mut decoder = DpcmDecoder::new();
        let mut stream = DpcmStream::default();
        for index in 0..packets {
            match self.socket.recv_packet(DPCM_PACKET_LEN).await? {
                Some(packet) => match decoder.decode_raw(&packet) {
                    Ok(block) => stream.push(block),
                    Err(error) => {
                        warn!(index, %error, "skipping audio packet");
                        stream.reject(index as usize, error);
                    }
                },
                None => warn!(index, "audio packet timed out"),
            }
        }

        info!(
            requested = packets,
            decoded = stream.packets,
            rejected = stream.rejected.len(),
            "dpcm session finished"
        );
        Ok(stream)
    }

    /// Stream `packets` AQ-DPCM packets and decode them.
    pub async fn aqdpcm_session(&mut self, code: &str, packets: u32) -> Result<AqDpcmStream, LabError> {
        let request = Request::SoundAq {
            code: code.to_string(),
            packets,
        };
        self.socket.set_recv_timeout(self.config.audio_timeout);
        self.socket.send_request(&request).await?;

        let mut decoder = AqDpcmDecoder::new();
        let mut stream = AqDpcmStream::default();
        for index in 0..packets {
            match self.socket.recv_packet(AQ_DPCM_PACKET_LEN).await? {
                Some(packet) => match decoder.decode_raw(&packet) {
                    Ok(block) => stream.push(block),
                    Err(error) => {
                        warn!(index, %error, "skipping audio packet");
                        stream.reject(index as usize, error);
                    }
                },
                None => warn!(index, "audio packet timed out"),
            }
        }

        info!(
            requested = packets,
            decoded = stream.packets(),
            rejected = stream.rejected.len(),
            "aq-dpcm session finished"
        );
        Ok(stream)
    }

    /// Fetch one image.
    ///
    /// With `flow`, a `NEXT` is sent after every full datagram. The transfer
    /// ends at the first datagram shorter or longer than `packet_len`, or at
    /// a receive timeout.
    pub async fn image(
        &mut self,
        code: &str,
        camera: &str,
        packet_len: usize,
        flow: bool,
    ) -> Result<Vec<u8>, LabError> {
        let request = Request::Image {
            code: code.to_string(),
            camera: camera.to_string(),
            packet_len,
            flow,
        };
        self.socket.set_recv_timeout(self.config.echo_timeout);
        self.socket.send_request(&request).await?;

        let mut assembler = ImageAssembler::new(packet_len);
        loop {
            match self.socket.recv_packet(packet_len).await? {
                Some(packet) => {
                    if assembler.push(&packet) {
                        break;
                    }
                    if flow {
                        self.socket.send_request(&Request::Next).await?;
                    }
                }
                None => {
                    warn!(packets = assembler.packets(), "image transfer timed out");
                    break;
                }
            }
        }

        debug!(packets = assembler.packets(), bytes = assembler.frame().len(), "image received");
        Ok(assembler.into_frame())
    }

    /// Ask the PTZ camera to move.
    pub async fn move_camera(&self, code: &str, direction: &str) -> Result<(), LabError> {
        let request = Request::CameraMove {
            code: code.to_string(),
            direction: direction.to_string(),
        };
        self.socket.send_request(&request).await?;
        Ok(())
    }

    /// Listen for `readings` copter telemetry lines.
    pub async fn copter_telemetry(&self, readings: usize) -> Result<Vec<CopterReading>, LabError> {
        let bind = unspecified(
            self.socket.local_addr().map_err(TransportError::from)?,
            self.config.copter_telemetry_port,
        );
        let rx = UdpSocket::bind(bind).await.map_err(TransportError::from)?;
        let mut buffer = [0u8; COPTER_LINE_MAX];
        let mut out = Vec::with_capacity(readings);

        for index in 0..readings {
            let recv = rx.recv_from(&mut buffer);
            let len = match tokio::time::timeout(self.config.echo_timeout, recv).await {
                Ok(result) => result.map_err(TransportError::from)?.0,
                Err(_) => {
                    warn!(index, "copter telemetry timed out");
                    continue;
                }
            };

            let line = String::from_utf8_lossy(&buffer[..len]);
            match line.trim().parse::<CopterReading>() {
                Ok(reading) => out.push(reading),
                Err(error) => warn!(index, %error, "skipping copter line"),
            }
        }
        Ok(out)
    }

    /// Send `commands` autopilot commands and return the copter's replies.
    pub async fn copter_autopilot(
        &self,
        flight_level: u16,
        motor: u16,
        commands: usize,
    ) -> Result<Vec<String>, LabError> {
        let addr = resolve(&self.config.host, self.config.copter_tcp_port).await?;
        let mut link = LineLink::connect(addr, b'\n').await?;
        let request = Request::CopterAutopilot {
            flight_level,
            motor,
        };

        let mut replies = Vec::with_capacity(commands);
        for _ in 0..commands {
            let reply = link.exchange(&request).await?;
            debug!(%reply, "autopilot reply");
            replies.push(reply);
        }
        Ok(replies)
    }

    /// Query a vehicle parameter `readings` times.
    pub async fn vehicle(
        &self,
        parameter: VehicleParameter,
        readings: usize,
    ) -> Result<Vec<VehicleReading>, LabError> {
        let addr = resolve(&self.config.host, self.config.vehicle_tcp_port).await?;
        let mut link = LineLink::connect(addr, b'\r').await?;
        let request = Request::Vehicle(parameter);

        let mut out = Vec::with_capacity(readings);
        for index in 0..readings {
            let reply = match link.exchange(&request).await {
                Ok(reply) => reply,
                Err(error) if error.is_recoverable() => {
                    warn!(index, %error, "skipping vehicle reply");
                    continue;
                }
                Err(error) => return Err(error.into()),
            };
            match parse_reply(&reply, parameter) {
                Ok(reading) => out.push(reading),
                Err(error) => warn!(index, %error, %reply, "skipping vehicle reply"),
            }
        }
        Ok(out)
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| TransportError::Resolve(format!("{host}:{port}")))
}

fn unspecified(like: SocketAddr, port: u16) -> SocketAddr {
    if like.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, port).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, port).into()
    }
}
