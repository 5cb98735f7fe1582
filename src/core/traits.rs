//! Core traits shared by the audio decoders.

use super::error::DecodeError;
use super::packet::RawPacket;

/// A stateful per-stream packet decoder.
///
/// Implementations keep the running state of one audio stream. Packets of a
/// stream MUST be fed to a single decoder in arrival order: the first sample
/// of every packet is predicted from the last sample of the previous one.
///
/// # Example
///
/// ```
/// use ithaki_telemetry::prelude::*;
///
/// let mut decoder = DpcmDecoder::new();
/// let block = decoder.decode_packet(&[0x98; 128]).unwrap();
/// assert_eq!(&block.samples[..2], &[0, 1]);
/// assert_eq!(decoder.packets_decoded(), 1);
/// ```
pub trait PacketDecoder {
    /// Decoded output of one packet.
    type Block;

    /// Decode one packet and advance the stream state.
    ///
    /// On error the stream state is left untouched.
    fn decode_packet(&mut self, packet: &[u8]) -> Result<Self::Block, DecodeError>;

    /// Number of packets decoded since the session started.
    fn packets_decoded(&self) -> u64;

    /// Forget the stream state; the next packet is treated as the first.
    fn reset(&mut self);

    /// Decode an owned packet snapshot.
    fn decode_raw(&mut self, packet: &RawPacket) -> Result<Self::Block, DecodeError> {
        self.decode_packet(packet.data())
    }
}
