//! Error types for the decoding and estimation engine.

use thiserror::Error;

/// Errors raised while decoding an audio packet.
///
/// A failed packet never mutates decoder state, so the stream stays
/// decodable after the error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Packet length outside what the decoder can read.
    #[error("invalid packet: {len} bytes, expected {}", accepted_lengths(.min, .max))]
    InvalidPacket {
        /// Received length.
        len: usize,
        /// Minimum accepted length.
        min: usize,
        /// Maximum accepted length, `None` when unbounded.
        max: Option<usize>,
    },
}

fn accepted_lengths(min: &usize, max: &Option<usize>) -> String {
    match max {
        Some(max) => format!("{min}..={max}"),
        None => format!("at least {min}"),
    }
}

/// A packet a stream decoder skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedPacket {
    /// Position of the packet in the input sequence.
    pub index: usize,
    /// Why it was skipped.
    pub error: DecodeError,
}

/// Errors raised by the estimators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EstimateError {
    /// A window boundary was crossed with no elapsed time.
    #[error("degenerate {window_ms}ms window: boundary at {timestamp_ms}ms, window started {start_ms}ms")]
    DegenerateWindow {
        /// Nominal window duration.
        window_ms: u64,
        /// Timestamp of the triggering observation.
        timestamp_ms: u64,
        /// Start of the current window.
        start_ms: u64,
    },
}

/// Errors raised while parsing text telemetry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// A required tag is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A tag is present but its value does not parse.
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue {
        /// Tag name.
        field: &'static str,
        /// Raw value.
        value: String,
    },

    /// Wrong number of fields in a reply.
    #[error("expected {expected} fields, got {actual}")]
    FieldCount {
        /// Expected field count.
        expected: usize,
        /// Actual field count.
        actual: usize,
    },

    /// Reply mode or PID does not match the request.
    #[error("unexpected reply header: {0:?}")]
    UnexpectedHeader(String),
}

/// Top-level lab errors.
#[derive(Debug, Error)]
pub enum LabError {
    /// Decode error.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Estimate error.
    #[error("estimate error: {0}")]
    Estimate(#[from] EstimateError),

    /// Telemetry error.
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Transport error.
    #[cfg(feature = "transport")]
    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_packet_message() {
        let short = DecodeError::InvalidPacket {
            len: 2,
            min: 4,
            max: None,
        };
        assert_eq!(short.to_string(), "invalid packet: 2 bytes, expected at least 4");

        let long = DecodeError::InvalidPacket {
            len: 133,
            min: 4,
            max: Some(132),
        };
        assert_eq!(long.to_string(), "invalid packet: 133 bytes, expected 4..=132");
    }
}
