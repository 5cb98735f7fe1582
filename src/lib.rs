//! # Ithaki Telemetry
//!
//! Client-side engine for the Ithaki network lab: it measures the link with
//! echo requests and decodes the audio the lab streams back.
//!
//! - **Decoding**: DPCM and AQ-DPCM audio packets to amplitude series, with
//!   saturating reconstruction and continuity across packets
//! - **Estimation**: smoothed RTT, mean deviation and RTO, plus windowed
//!   throughput over 8, 16 and 32 second windows
//! - **Telemetry**: request codes, copter lines, vehicle OBD-II replies and
//!   image reassembly
//! - **Transport**: async UDP/TCP sessions against the lab
//!
//! ## Feature Flags
//!
//! - `transport` (default): tokio UDP socket pair and TCP line link
//! - `client` (default): high-level [`client::LabClient`]
//! - `serde`: `Serialize`/`Deserialize` on output records
//! - `full`: all of the above
//!
//! ## Modules
//!
//! - [`core`]: Constants, errors, packet snapshots and the decoder trait
//! - [`codec`]: DPCM / AQ-DPCM decoders, PCM buffers and WAV files
//! - [`estimate`]: RTT and throughput estimators
//! - [`telemetry`]: Request codes and text/image telemetry
//! - [`export`]: One-value-per-line series files
//! - [`transport`]: Sockets (requires `transport` feature)
//! - [`client`]: Lab sessions (requires `client` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use ithaki_telemetry::prelude::*;
//!
//! // Two AQ-DPCM packets: mean 0, step 1, zero differences.
//! let mut packet = vec![0x00, 0x00, 0x01, 0x00];
//! packet.extend_from_slice(&[0x88; 4]);
//!
//! let mut decoder = AqDpcmDecoder::with_padding(PaddingPolicy::Truncate);
//! let stream = decoder.decode_all([&packet, &packet]);
//! assert_eq!(stream.samples.len(), 16);
//! assert!(stream.rejected.is_empty());
//! assert!(stream.samples.iter().all(|&s| s == 0));
//!
//! // Round trips of 100, 120 and 90 ms.
//! let samples = RttEstimator::estimate_series(&[100, 120, 90], RttParams::default());
//! assert_eq!(samples.len(), 3);
//! assert!((samples[0].rto - 300.0).abs() < 1e-9);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Decoding and estimation (always included)
pub mod codec;
pub mod estimate;
pub mod export;
pub mod telemetry;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::*;

    // Decoders and estimators
    pub use crate::codec::{
        AqDpcmBlock, AqDpcmDecoder, AqDpcmStream, AudioPacketHeader, DpcmBlock, DpcmDecoder,
        DpcmStream, PaddingPolicy, WavSink, WavSpec,
    };
    pub use crate::estimate::{
        EchoRecorder, EchoReport, RttEstimator, RttParams, RttSample, ThroughputMonitor,
        ThroughputSample, ThroughputWindow, WindowConfig,
    };
    pub use crate::telemetry::{CopterReading, Request, VehicleParameter, VehicleReading};

    // Transport types (when enabled)
    #[cfg(feature = "transport")]
    pub use crate::transport::{LabSocket, LabSocketBuilder, TransportError, TransportResult};

    // Client types (when enabled)
    #[cfg(feature = "client")]
    pub use crate::client::{LabClient, LabConfig};
}

// Re-export commonly used items at crate root
pub use crate::core::{DecodeError, EstimateError, LabError, PacketDecoder, RawPacket, TelemetryError};

#[cfg(feature = "transport")]
pub use crate::transport::{LabSocket, TransportError};
