//! DPCM audio decoder.
//!
//! Wire format: headerless 128-byte packets. Each byte carries two 4-bit
//! differences, low nibble first, unscaled. Amplitudes are 8-bit signed and
//! saturate at [-128, 127].

use tracing::{trace, warn};

use crate::core::constants::{DPCM_MAX, DPCM_MIN};
use crate::core::{DecodeError, PacketDecoder, RejectedPacket};

use super::nibble::{NibbleCodec, NibbleOrder};
use super::reconstruct::{ClampRange, SampleReconstructor, Seed};

/// DPCM amplitude bounds.
pub const DPCM_RANGE: ClampRange = ClampRange::new(DPCM_MIN, DPCM_MAX);

/// Output of one DPCM packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DpcmBlock {
    /// Reconstructed amplitudes.
    pub samples: Vec<i8>,
    /// Signed nibble differences, in emission order.
    pub differences: Vec<i32>,
}

/// Concatenated output of a DPCM session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DpcmStream {
    /// Reconstructed amplitudes across all packets.
    pub samples: Vec<i8>,
    /// Differences across all packets.
    pub differences: Vec<i32>,
    /// Packets decoded into this stream.
    pub packets: usize,
    /// Packets skipped as undecodable, in input order.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub rejected: Vec<RejectedPacket>,
}

impl DpcmStream {
    /// Append a decoded block.
    pub fn push(&mut self, block: DpcmBlock) {
        self.samples.extend_from_slice(&block.samples);
        self.differences.extend_from_slice(&block.differences);
        self.packets += 1;
    }

    /// Record a packet that could not be decoded.
    pub fn reject(&mut self, index: usize, error: DecodeError) {
        self.rejected.push(RejectedPacket { index, error });
    }
}

/// Stateful DPCM decoder for one audio stream.
#[derive(Debug, Clone)]
pub struct DpcmDecoder {
    reconstructor: SampleReconstructor,
    /// Last sample of the previous packet, `None` before the first packet.
    last_sample: Option<i32>,
    packets: u64,
    diff_buf: Vec<i32>,
    sample_buf: Vec<i32>,
}

impl Default for DpcmDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DpcmDecoder {
    /// Create a decoder at the start of a session.
    pub fn new() -> Self {
        Self {
            reconstructor: SampleReconstructor::new(DPCM_RANGE),
            last_sample: None,
            packets: 0,
            diff_buf: Vec::new(),
            sample_buf: Vec::new(),
        }
    }

    /// Last reconstructed amplitude, if any packet has been decoded.
    pub fn last_sample(&self) -> Option<i8> {
        self.last_sample.map(|s| s as i8)
    }

    /// Decode every packet in order into one stream.
    ///
    /// Invalid packets are skipped and listed in [`DpcmStream::rejected`];
    /// the next valid packet continues from the last decoded sample.
    pub fn decode_all<I, P>(&mut self, packets: I) -> DpcmStream
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut stream = DpcmStream::default();
        for (index, packet) in packets.into_iter().enumerate() {
            match self.decode_packet(packet.as_ref()) {
                Ok(block) => stream.push(block),
                Err(error) => {
                    warn!(index, %error, "skipping dpcm packet");
                    stream.reject(index, error);
                }
            }
        }
        stream
    }
}

impl PacketDecoder for DpcmDecoder {
    type Block = DpcmBlock;

    fn decode_packet(&mut self, packet: &[u8]) -> Result<DpcmBlock, DecodeError> {
        if packet.is_empty() {
            return Err(DecodeError::InvalidPacket {
                len: 0,
                min: 1,
                max: None,
            });
        }

        self.diff_buf.clear();
        NibbleCodec::differences(packet, NibbleOrder::LowFirst, 1, &mut self.diff_buf);

        let seed = match self.last_sample {
            None => Seed::Origin(0),
            Some(prev) => Seed::Continue(prev),
        };

        self.sample_buf.clear();
        self.last_sample = self
            .reconstructor
            .reconstruct(seed, &self.diff_buf, &mut self.sample_buf);
        self.packets += 1;

        trace!(
            packet = self.packets,
            len = packet.len(),
            last = ?self.last_sample,
            "decoded dpcm packet"
        );

        Ok(DpcmBlock {
            // Reconstruction saturates to the i8 range, so the cast is exact.
            samples: self.sample_buf.iter().map(|&s| s as i8).collect(),
            differences: self.diff_buf.clone(),
        })
    }

    fn packets_decoded(&self) -> u64 {
        self.packets
    }

    fn reset(&mut self) {
        self.last_sample = None;
        self.packets = 0;
    }
}
