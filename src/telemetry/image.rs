//! Image transfer reassembly.
//!
//! The lab sends a JPEG as a run of fixed-size datagrams. The first datagram
//! whose length differs from the requested size ends the frame.

use crate::core::RawPacket;

/// Collects image datagrams into one frame.
#[derive(Debug, Clone)]
pub struct ImageAssembler {
    packet_len: usize,
    frame: Vec<u8>,
    packets: usize,
    complete: bool,
}

impl ImageAssembler {
    /// Create an assembler for datagrams of `packet_len` bytes.
    pub fn new(packet_len: usize) -> Self {
        Self {
            packet_len,
            frame: Vec::new(),
            packets: 0,
            complete: false,
        }
    }

    /// Append one datagram. Returns `true` once the frame is complete.
    ///
    /// Datagrams pushed after completion are ignored.
    pub fn push(&mut self, packet: &RawPacket) -> bool {
        if self.complete {
            return true;
        }
        self.frame.extend_from_slice(packet.data());
        self.packets += 1;
        self.complete = packet.len() != self.packet_len;
        self.complete
    }

    /// Whether the end-of-frame datagram has arrived.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Datagrams received.
    pub fn packets(&self) -> usize {
        self.packets
    }

    /// Bytes received so far.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    /// Take the assembled bytes.
    pub fn into_frame(self) -> Vec<u8> {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_packet_ends_frame() {
        let mut assembler = ImageAssembler::new(4);

        assert!(!assembler.push(&RawPacket::new(vec![0xFF, 0xD8, 1, 2], 0, 4)));
        assert!(!assembler.push(&RawPacket::new(vec![3, 4, 5, 6], 1, 4)));
        assert!(assembler.push(&RawPacket::new(vec![0xFF, 0xD9], 2, 4)));

        assert!(assembler.is_complete());
        assert_eq!(assembler.packets(), 3);
        assert_eq!(assembler.frame().len(), 10);

        // Ignored after completion.
        assert!(assembler.push(&RawPacket::new(vec![9; 4], 3, 4)));
        assert_eq!(assembler.into_frame().len(), 10);
    }
}
