//! Lab client configuration.

use std::str::FromStr;
use std::time::Duration;

use crate::core::LabError;
use crate::core::constants::{
    AUDIO_TIMEOUT, CLIENT_PORT, COPTER_TCP_PORT, COPTER_TELEMETRY_PORT, ECHO_SESSION,
    ECHO_TIMEOUT, LAB_HOST, SERVER_PORT, VEHICLE_TCP_PORT,
};

/// Default image datagram size.
pub const DEFAULT_IMAGE_PACKET_LEN: usize = 128;

/// Where the lab lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabConfig {
    /// Lab host name or address.
    pub host: String,

    /// Lab port requests are sent to.
    pub server_port: u16,

    /// Local port the lab sends replies to.
    pub client_port: u16,

    /// Local port copter telemetry arrives on.
    pub copter_telemetry_port: u16,

    /// Lab port of the copter autopilot.
    pub copter_tcp_port: u16,

    /// Lab port of the vehicle OBD-II link.
    pub vehicle_tcp_port: u16,

    /// Wait for an echo, image or telemetry datagram.
    pub echo_timeout: Duration,

    /// Wait for an audio datagram.
    pub audio_timeout: Duration,

    /// Length of an echo session.
    pub echo_session: Duration,

    /// Image datagram size.
    pub image_packet_len: usize,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            host: LAB_HOST.to_string(),
            server_port: SERVER_PORT,
            client_port: CLIENT_PORT,
            copter_telemetry_port: COPTER_TELEMETRY_PORT,
            copter_tcp_port: COPTER_TCP_PORT,
            vehicle_tcp_port: VEHICLE_TCP_PORT,
            echo_timeout: ECHO_TIMEOUT,
            audio_timeout: AUDIO_TIMEOUT,
            echo_session: ECHO_SESSION,
            image_packet_len: DEFAULT_IMAGE_PACKET_LEN,
        }
    }
}

impl LabConfig {
    /// Defaults overridden by `ITHAKI_*` environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `ITHAKI_HOST` | `host` |
    /// | `ITHAKI_SERVER_PORT` | `server_port` |
    /// | `ITHAKI_CLIENT_PORT` | `client_port` |
    /// | `ITHAKI_COPTER_TELEMETRY_PORT` | `copter_telemetry_port` |
    /// | `ITHAKI_COPTER_TCP_PORT` | `copter_tcp_port` |
    /// | `ITHAKI_VEHICLE_TCP_PORT` | `vehicle_tcp_port` |
    /// | `ITHAKI_ECHO_TIMEOUT_MS` | `echo_timeout` |
    /// | `ITHAKI_AUDIO_TIMEOUT_MS` | `audio_timeout` |
    /// | `ITHAKI_ECHO_SESSION_SECS` | `echo_session` |
    /// | `ITHAKI_IMAGE_PACKET_LEN` | `image_packet_len` |
    pub fn from_env() -> Result<Self, LabError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LabError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("ITHAKI_HOST") {
            if host.trim().is_empty() {
                return Err(LabError::Config("ITHAKI_HOST is empty".into()));
            }
            config.host = host.trim().to_string();
        }
        if let Some(v) = parse_var(&lookup, "ITHAKI_SERVER_PORT")? {
            config.server_port = v;
        }
        if let Some(v) = parse_var(&lookup, "ITHAKI_CLIENT_PORT")? {
            config.client_port = v;
        }
        if let Some(v) = parse_var(&lookup, "ITHAKI_COPTER_TELEMETRY_PORT")? {
            config.copter_telemetry_port = v;
        }
        if let Some(v) = parse_var(&lookup, "ITHAKI_COPTER_TCP_PORT")? {
            config.copter_tcp_port = v;
        }
        if let Some(v) = parse_var(&lookup, "ITHAKI_VEHICLE_TCP_PORT")? {
            config.vehicle_tcp_port = v;
        }
        if let Some(v) = parse_var(&lookup, "ITHAKI_ECHO_TIMEOUT_MS")? {
            config.echo_timeout = Duration::from_millis(v);
        }
        if let Some(v) = parse_var(&lookup, "ITHAKI_AUDIO_TIMEOUT_MS")? {
            config.audio_timeout = Duration::from_millis(v);
        }
        if let Some(v) = parse_var(&lookup, "ITHAKI_ECHO_SESSION_SECS")? {
            config.echo_session = Duration::from_secs(v);
        }
        if let Some(v) = parse_var::<usize, _>(&lookup, "ITHAKI_IMAGE_PACKET_LEN")? {
            if v == 0 {
                return Err(LabError::Config("ITHAKI_IMAGE_PACKET_LEN must be positive".into()));
            }
            config.image_packet_len = v;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, LabError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| LabError::Config(format!("{key}: invalid value {raw:?}"))),
    }
}

/// Builder for a [`LabConfig`].
#[derive(Debug, Default)]
pub struct LabConfigBuilder {
    config: LabConfig,
}

impl LabConfigBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lab host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the lab request port.
    pub fn server_port(mut self, port: u16) -> Self {
        self.config.server_port = port;
        self
    }

    /// Set the local reply port.
    pub fn client_port(mut self, port: u16) -> Self {
        self.config.client_port = port;
        self
    }

    /// Set the local copter telemetry port.
    pub fn copter_telemetry_port(mut self, port: u16) -> Self {
        self.config.copter_telemetry_port = port;
        self
    }

    /// Set the copter autopilot port.
    pub fn copter_tcp_port(mut self, port: u16) -> Self {
        self.config.copter_tcp_port = port;
        self
    }

    /// Set the vehicle port.
    pub fn vehicle_tcp_port(mut self, port: u16) -> Self {
        self.config.vehicle_tcp_port = port;
        self
    }

    /// Set the echo/image/telemetry receive timeout.
    pub fn echo_timeout(mut self, timeout: Duration) -> Self {
        self.config.echo_timeout = timeout;
        self
    }

    /// Set the audio receive timeout.
    pub fn audio_timeout(mut self, timeout: Duration) -> Self {
        self.config.audio_timeout = timeout;
        self
    }

    /// Set the echo session length.
    pub fn echo_session(mut self, duration: Duration) -> Self {
        self.config.echo_session = duration;
        self
    }

    /// Set the image datagram size.
    pub fn image_packet_len(mut self, len: usize) -> Self {
        self.config.image_packet_len = len;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> LabConfig {
        self.config
    }
}
