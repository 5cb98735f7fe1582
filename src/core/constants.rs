//! Lab protocol and decoder constants.
//!
//! Values that mirror the reference lab behaviour. Changing any of them breaks
//! bit-exact agreement with previously exported series.

use std::time::Duration;

// =============================================================================
// AUDIO PACKETS
// =============================================================================

/// DPCM packet size (no header, 2 differences per byte).
pub const DPCM_PACKET_LEN: usize = 128;

/// AQ-DPCM packet size (4-byte header + 124 payload bytes).
pub const AQ_DPCM_PACKET_LEN: usize = 128;

/// AQ-DPCM header size (mean LE16 + step LE16).
pub const AQ_DPCM_HEADER_LEN: usize = 4;

/// Differences produced by one byte.
pub const NIBBLES_PER_BYTE: usize = 2;

/// Slots in the AQ-DPCM per-packet working buffer.
pub const AQ_DPCM_SLOTS: usize = NIBBLES_PER_BYTE * AQ_DPCM_PACKET_LEN;

/// Bias subtracted from a raw nibble (0..=15) to get a signed difference.
pub const NIBBLE_BIAS: i32 = 8;

/// DPCM amplitude bounds (8-bit signed).
pub const DPCM_MIN: i32 = -128;
/// DPCM amplitude upper bound.
pub const DPCM_MAX: i32 = 127;

/// AQ-DPCM bounds on the unbiased (pre-mean) amplitude.
pub const AQ_DPCM_MIN: i32 = -32000;
/// AQ-DPCM upper bound on the unbiased amplitude.
pub const AQ_DPCM_MAX: i32 = 32000;

/// Audio sample rate used by the lab.
pub const SAMPLE_RATE_HZ: u32 = 8000;

// =============================================================================
// RTT ESTIMATION
// =============================================================================

/// SRTT smoothing weight on the previous estimate.
pub const SRTT_ALPHA: f64 = 0.9;

/// Mean-deviation smoothing weight on the previous deviation.
pub const DEVIATION_BETA: f64 = 0.75;

/// Deviation multiplier in the RTO.
pub const RTO_K: f64 = 4.0;

// =============================================================================
// THROUGHPUT WINDOWS
// =============================================================================

/// Short throughput window.
pub const WINDOW_8S_MS: u64 = 8000;
/// Early-close margin for the short window (closes past 7600 ms).
pub const WINDOW_8S_MARGIN_MS: u64 = 400;

/// Medium throughput window.
pub const WINDOW_16S_MS: u64 = 16000;
/// Early-close margin for the medium window (closes past 15500 ms).
pub const WINDOW_16S_MARGIN_MS: u64 = 500;

/// Long throughput window.
pub const WINDOW_32S_MS: u64 = 32000;
/// Early-close margin for the long window (closes past 31600 ms).
pub const WINDOW_32S_MARGIN_MS: u64 = 400;

// =============================================================================
// LAB ENDPOINTS
// =============================================================================

/// Reference lab host.
pub const LAB_HOST: &str = "155.207.18.208";

/// Lab UDP request port.
pub const SERVER_PORT: u16 = 38019;

/// Local UDP port the lab replies to.
pub const CLIENT_PORT: u16 = 48019;

/// Local UDP port the copter streams telemetry to.
pub const COPTER_TELEMETRY_PORT: u16 = 48078;

/// Copter autopilot TCP port.
pub const COPTER_TCP_PORT: u16 = 38048;

/// Vehicle OBD-II TCP port.
pub const VEHICLE_TCP_PORT: u16 = 29078;

/// Echo reply size.
pub const ECHO_REPLY_LEN: usize = 32;

/// Echo reply size when temperature readings are requested.
pub const ECHO_TEMPERATURE_REPLY_LEN: usize = 54;

/// Echo requests sent by the connection warm-up.
pub const INITIATE_ECHOES: usize = 4;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Receive timeout for echo replies.
pub const ECHO_TIMEOUT: Duration = Duration::from_millis(4000);

/// Receive timeout for audio packets.
pub const AUDIO_TIMEOUT: Duration = Duration::from_millis(500);

/// Default length of an echo measurement session.
pub const ECHO_SESSION: Duration = Duration::from_secs(240);
