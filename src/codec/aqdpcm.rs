//! AQ-DPCM (adaptive quantization DPCM) audio decoder.
//!
//! Wire format of a 128-byte packet:
//! ```text
//! +0  Mean (2 bytes LE16, signed)   - packet DC offset
//! +2  Step (2 bytes LE16, unsigned) - packet quantization scale
//! +4  Payload (124 bytes)           - two differences per byte, high nibble first
//! ```
//!
//! Differences are multiplied by `step` and integrated into unbiased
//! amplitudes saturating at [-32000, 32000]. The packet `mean` is added to
//! every sample only after the whole packet is reconstructed.
//!
//! The payload yields 248 differences while the per-packet working buffer has
//! 256 slots. [`PaddingPolicy`] decides what happens to the remaining 8.

use tracing::{trace, warn};

use crate::core::constants::{AQ_DPCM_HEADER_LEN, AQ_DPCM_MAX, AQ_DPCM_MIN, AQ_DPCM_SLOTS};
use crate::core::{DecodeError, PacketDecoder, RejectedPacket};

use super::nibble::{NibbleCodec, NibbleOrder};
use super::reconstruct::{ClampRange, SampleReconstructor, Seed};

/// Bounds on the unbiased AQ-DPCM amplitude.
pub const AQ_DPCM_RANGE: ClampRange = ClampRange::new(AQ_DPCM_MIN, AQ_DPCM_MAX);

/// Per-packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioPacketHeader {
    /// DC offset added to every sample of the packet.
    pub mean: i16,
    /// Multiplier applied to every difference of the packet.
    pub step: u16,
}

impl AudioPacketHeader {
    /// Header wire size.
    pub const SIZE: usize = AQ_DPCM_HEADER_LEN;

    /// Parse the header from the first 4 bytes of a packet.
    pub fn parse(packet: &[u8]) -> Result<Self, DecodeError> {
        let Some(header) = packet.get(..Self::SIZE) else {
            return Err(DecodeError::InvalidPacket {
                len: packet.len(),
                min: Self::SIZE,
                max: None,
            });
        };
        Ok(Self {
            mean: i16::from_le_bytes([header[0], header[1]]),
            step: u16::from_le_bytes([header[2], header[3]]),
        })
    }
}

/// What to do with working-buffer slots the payload does not fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaddingPolicy {
    /// Every packet spans the full 256-slot buffer. Slots past the payload
    /// hold a zero difference and are reconstructed and exported like the
    /// others, so a 124-byte payload yields 256 samples whose last 8 repeat.
    #[default]
    ZeroPad,
    /// Only slots filled by the payload are reconstructed and exported.
    Truncate,
}

/// Output of one AQ-DPCM packet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AqDpcmBlock {
    /// Packet header.
    pub header: AudioPacketHeader,
    /// Amplitudes with the packet mean already added.
    pub samples: Vec<i32>,
    /// Step-scaled differences.
    pub differences: Vec<i32>,
}

/// Concatenated output of an AQ-DPCM session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AqDpcmStream {
    /// Amplitudes across all packets (mean added).
    pub samples: Vec<i32>,
    /// Differences across all packets.
    pub differences: Vec<i32>,
    /// Per-packet mean, parallel to the decoded packets.
    pub means: Vec<i16>,
    /// Per-packet step, parallel to the decoded packets.
    pub steps: Vec<u16>,
    /// Packets skipped as undecodable, in input order.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub rejected: Vec<RejectedPacket>,
}

impl AqDpcmStream {
    /// Append a decoded block.
    pub fn push(&mut self, block: AqDpcmBlock) {
        self.samples.extend_from_slice(&block.samples);
        self.differences.extend_from_slice(&block.differences);
        self.means.push(block.header.mean);
        self.steps.push(block.header.step);
    }

    /// Record a packet that could not be decoded.
    pub fn reject(&mut self, index: usize, error: DecodeError) {
        self.rejected.push(RejectedPacket { index, error });
    }

    /// Packets decoded into this stream.
    pub fn packets(&self) -> usize {
        self.means.len()
    }
}

/// Stateful AQ-DPCM decoder for one audio stream.
#[derive(Debug, Clone)]
pub struct AqDpcmDecoder {
    reconstructor: SampleReconstructor,
    padding: PaddingPolicy,
    /// Last exposed (mean-added) sample of the previous packet.
    last_sample: Option<i32>,
    packets: u64,
    diff_buf: Vec<i32>,
    sample_buf: Vec<i32>,
}

impl Default for AqDpcmDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AqDpcmDecoder {
    /// Create a decoder with the default [`PaddingPolicy::ZeroPad`].
    pub fn new() -> Self {
        Self::with_padding(PaddingPolicy::default())
    }

    /// Create a decoder with an explicit padding policy.
    pub fn with_padding(padding: PaddingPolicy) -> Self {
        Self {
            reconstructor: SampleReconstructor::new(AQ_DPCM_RANGE),
            padding,
            last_sample: None,
            packets: 0,
            diff_buf: Vec::with_capacity(AQ_DPCM_SLOTS),
            sample_buf: Vec::with_capacity(AQ_DPCM_SLOTS),
        }
    }

    /// Active padding policy.
    pub fn padding(&self) -> PaddingPolicy {
        self.padding
    }

    /// Last exposed sample, if any packet has been decoded.
    pub fn last_sample(&self) -> Option<i32> {
        self.last_sample
    }

    /// Decode every packet in order into one stream.
    ///
    /// Invalid packets are skipped and listed in [`AqDpcmStream::rejected`];
    /// the next valid packet continues from the last exposed sample.
    pub fn decode_all<I, P>(&mut self, packets: I) -> AqDpcmStream
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut stream = AqDpcmStream::default();
        for (index, packet) in packets.into_iter().enumerate() {
            match self.decode_packet(packet.as_ref()) {
                Ok(block) => stream.push(block),
                Err(error) => {
                    warn!(index, %error, "skipping aq-dpcm packet");
                    stream.reject(index, error);
                }
            }
        }
        stream
    }

    /// Longest packet the padding policy accepts, `None` when unbounded.
    fn max_packet_len(&self) -> Option<usize> {
        match self.padding {
            PaddingPolicy::ZeroPad => Some(AudioPacketHeader::SIZE + AQ_DPCM_SLOTS / 2),
            PaddingPolicy::Truncate => None,
        }
    }
}

impl PacketDecoder for AqDpcmDecoder {
    type Block = AqDpcmBlock;

    fn decode_packet(&mut self, packet: &[u8]) -> Result<AqDpcmBlock, DecodeError> {
        let header = AudioPacketHeader::parse(packet)?;

        let max = self.max_packet_len();
        if max.is_some_and(|max| packet.len() > max) {
            return Err(DecodeError::InvalidPacket {
                len: packet.len(),
                min: AudioPacketHeader::SIZE,
                max,
            });
        }

        let payload = &packet[AudioPacketHeader::SIZE..];
        self.diff_buf.clear();
        NibbleCodec::differences(
            payload,
            NibbleOrder::HighFirst,
            header.step as i32,
            &mut self.diff_buf,
        );
        if self.padding == PaddingPolicy::ZeroPad {
            self.diff_buf.resize(AQ_DPCM_SLOTS, 0);
        }

        let seed = match self.last_sample {
            None => Seed::Origin(0),
            Some(prev) => Seed::Continue(prev),
        };

        self.sample_buf.clear();
        self.reconstructor
            .reconstruct(seed, &self.diff_buf, &mut self.sample_buf);

        let mean = header.mean as i32;
        let samples: Vec<i32> = self.sample_buf.iter().map(|&s| s + mean).collect();
        // An empty truncated payload leaves the predictor where it was.
        if let Some(&last) = samples.last() {
            self.last_sample = Some(last);
        }
        self.packets += 1;

        trace!(
            packet = self.packets,
            mean = header.mean,
            step = header.step,
            samples = samples.len(),
            "decoded aq-dpcm packet"
        );

        Ok(AqDpcmBlock {
            header,
            samples,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::AQ_DPCM_PACKET_LEN;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn packet(mean: i16, step: u16, payload_byte: u8) -> Vec<u8> {
        let mut packet = Vec::with_capacity(AQ_DPCM_PACKET_LEN);
        packet.extend_from_slice(&mean.to_le_bytes());
        packet.extend_from_slice(&step.to_le_bytes());
        packet.resize(AQ_DPCM_PACKET_LEN, payload_byte);
        packet
    }

    #[test]
    fn test_header_decode() {
        let header = AudioPacketHeader::parse(&hex::decode("64000a00").unwrap()).unwrap();
        assert_eq!(header, AudioPacketHeader { mean: 100, step: 10 });
    }

    #[test]
    fn test_header_negative_mean() {
        let header = AudioPacketHeader::parse(&[0x9C, 0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(header.mean, -100);
        assert_eq!(header.step, u16::MAX);
    }

    #[test]
    fn test_short_header_rejected() {
        let mut decoder = AqDpcmDecoder::new();
        for len in 0..AudioPacketHeader::SIZE {
            assert_eq!(
                decoder.decode_packet(&vec![0u8; len]),
                Err(DecodeError::InvalidPacket {
                    len,
                    min: 4,
                    max: None
                })
            );
        }
        assert_eq!(decoder.packets_decoded(), 0);
        assert_eq!(decoder.last_sample(), None);
    }

    #[test]
    fn test_high_nibble_first_scaled_by_step() {
        let mut decoder = AqDpcmDecoder::new();
        let block = decoder.decode_packet(&packet(0, 10, 0xF0)).unwrap();

        // 0xF0: high 0xF -> 7, low 0x0 -> -8, times step 10
        assert_eq!(&block.differences[..4], &[70, -80, 70, -80]);
    }

    #[test]
    fn test_mean_added_after_reconstruction() {
        let mut decoder = AqDpcmDecoder::new();
        // 0x99: both nibbles +1, step 10 -> +10 per slot
        let block = decoder.decode_packet(&packet(100, 10, 0x99)).unwrap();

        assert_eq!(block.samples[0], 100);
        assert_eq!(block.samples[1], 110);
        assert_eq!(block.samples[247], 100 + 2470);
    }

    #[test]
    fn test_zero_pad_policy() {
        let mut decoder = AqDpcmDecoder::with_padding(PaddingPolicy::ZeroPad);
        let block = decoder.decode_packet(&packet(0, 1, 0x99)).unwrap();

        assert_eq!(block.samples.len(), 256);
        assert_eq!(block.differences.len(), 256);
        assert!(block.differences[248..].iter().all(|&d| d == 0));
        assert!(block.samples[247..].iter().all(|&s| s == 247));
    }

    #[test]
    fn test_truncate_policy() {
        let mut decoder = AqDpcmDecoder::with_padding(PaddingPolicy::Truncate);
        let block = decoder.decode_packet(&packet(0, 1, 0x99)).unwrap();

        assert_eq!(block.samples.len(), 248);
        assert_eq!(block.differences.len(), 248);
        assert_eq!(*block.samples.last().unwrap(), 247);
    }

    #[test]
    fn test_zero_pad_rejects_oversized_payload() {
        let mut decoder = AqDpcmDecoder::new();
        assert!(decoder.decode_packet(&vec![0u8; 132]).is_ok());
        assert!(matches!(
            decoder.decode_packet(&vec![0u8; 133]),
            Err(DecodeError::InvalidPacket {
                len: 133,
                max: Some(132),
                ..
            })
        ));
    }

    #[test]
    fn test_next_packet_seeds_from_exposed_sample() {
        let mut decoder = AqDpcmDecoder::with_padding(PaddingPolicy::Truncate);
        let first = decoder.decode_packet(&[0x05, 0x00, 0x02, 0x00, 0x99]).unwrap();
        // origin 0, then +2; mean 5
        assert_eq!(first.samples, vec![5, 7]);

        let second = decoder.decode_packet(&[0x00, 0x00, 0x03, 0x00, 0x98]).unwrap();
        // diffs [1*3, 0*3]; seed 7 + 3
        assert_eq!(second.differences, vec![3, 0]);
        assert_eq!(second.samples, vec![10, 10]);
    }

    #[test]
    fn test_unbiased_samples_saturate() {
        let mut decoder = AqDpcmDecoder::new();
        let up = decoder.decode_packet(&packet(0, u16::MAX, 0xFF)).unwrap();
        assert!(up.samples.iter().all(|&s| s <= AQ_DPCM_MAX));
        assert_eq!(*up.samples.last().unwrap(), AQ_DPCM_MAX);

        let down = decoder.decode_packet(&packet(0, u16::MAX, 0x00)).unwrap();
        assert_eq!(*down.samples.last().unwrap(), AQ_DPCM_MIN);
    }

    #[test]
    fn test_random_stream_pre_mean_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let packets: Vec<Vec<u8>> = (0..40)
            .map(|_| {
                let mut p = vec![0u8; AQ_DPCM_PACKET_LEN];
                rng.fill(p.as_mut_slice());
                // Zero mean so exposed samples equal the unbiased ones.
                p[0] = 0;
                p[1] = 0;
                p
            })
            .collect();

        let a = AqDpcmDecoder::new().decode_all(&packets);
        let b = AqDpcmDecoder::new().decode_all(&packets);

        assert_eq!(a, b);
        assert_eq!(a.packets(), 40);
        assert_eq!(a.steps.len(), 40);
        assert!(a.samples.iter().all(|&s| AQ_DPCM_RANGE.contains(s)));
    }

    #[test]
    fn test_decode_all_skips_invalid_packet() {
        let good = packet(100, 10, 0x99);
        let short = vec![0x64, 0x00];

        let stream = AqDpcmDecoder::new().decode_all([&good, &short, &good]);

        assert_eq!(stream.packets(), 2);
        assert_eq!(stream.samples.len(), 2 * 256);
        assert_eq!(
            stream.rejected,
            vec![RejectedPacket {
                index: 1,
                error: DecodeError::InvalidPacket {
                    len: 2,
                    min: 4,
                    max: None
                },
            }]
        );
        // The third packet continues from the first packet's last exposed sample.
        assert_eq!(stream.samples[255], 100 + 2470);
        assert_eq!(stream.samples[256], 100 + 2470 + 10 + 100);
    }
}
