//! Owned packet snapshots handed from the I/O layer to the core.

/// One received datagram, copied out of the socket buffer.
///
/// The core consumes a `RawPacket` once and never keeps it, so the I/O layer
/// is free to reuse its receive buffer immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    data: Vec<u8>,
    received_at_ms: u64,
    expected_len: usize,
}

impl RawPacket {
    /// Create a packet snapshot.
    pub fn new(data: Vec<u8>, received_at_ms: u64, expected_len: usize) -> Self {
        Self {
            data,
            received_at_ms,
            expected_len,
        }
    }

    /// Copy a borrowed buffer into a new snapshot.
    pub fn copy_from(data: &[u8], received_at_ms: u64, expected_len: usize) -> Self {
        Self::new(data.to_vec(), received_at_ms, expected_len)
    }

    /// Packet bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes received.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the datagram was empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Arrival time in milliseconds since session start.
    pub fn received_at_ms(&self) -> u64 {
        self.received_at_ms
    }

    /// Length the receiver asked for.
    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// True if the datagram length differs from the requested length.
    ///
    /// Image transfers use a short packet as the end-of-frame marker.
    pub fn is_short(&self) -> bool {
        self.data.len() != self.expected_len
    }

    /// Take ownership of the bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl AsRef<[u8]> for RawPacket {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_does_not_alias_source() {
        let mut buf = vec![1u8, 2, 3];
        let packet = RawPacket::copy_from(&buf, 10, 3);
        buf[0] = 99;

        assert_eq!(packet.data(), &[1, 2, 3]);
        assert_eq!(packet.received_at_ms(), 10);
        assert!(!packet.is_short());
    }

    #[test]
    fn test_short_packet() {
        let packet = RawPacket::new(vec![0; 100], 0, 128);
        assert!(packet.is_short());
        assert_eq!(packet.len(), 100);
        assert_eq!(packet.expected_len(), 128);
    }
}
