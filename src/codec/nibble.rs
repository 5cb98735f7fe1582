//! Signed nibble extraction.
//!
//! Every payload byte carries two 4-bit differences. A raw nibble `n` in
//! `0..=15` maps to the signed difference `n - 8` in `-8..=7`.

use crate::core::constants::NIBBLE_BIAS;

/// Order in which the two nibbles of a byte are emitted.
///
/// The two lab codecs disagree: DPCM emits the low nibble first, AQ-DPCM the
/// high nibble first. Decoders must keep their own order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NibbleOrder {
    /// `(byte & 0x0F)` then `(byte >> 4)`.
    LowFirst,
    /// `(byte >> 4)` then `(byte & 0x0F)`.
    HighFirst,
}

/// Nibble-to-difference primitive shared by the decoders.
#[derive(Debug, Clone, Copy, Default)]
pub struct NibbleCodec;

impl NibbleCodec {
    /// Split a byte into `(low, high)` signed differences.
    #[inline]
    pub const fn split(byte: u8) -> (i32, i32) {
        let low = (byte & 0x0F) as i32 - NIBBLE_BIAS;
        let high = ((byte >> 4) & 0x0F) as i32 - NIBBLE_BIAS;
        (low, high)
    }

    /// The two differences of `byte` in emission order.
    #[inline]
    pub const fn ordered(byte: u8, order: NibbleOrder) -> [i32; 2] {
        let (low, high) = Self::split(byte);
        match order {
            NibbleOrder::LowFirst => [low, high],
            NibbleOrder::HighFirst => [high, low],
        }
    }

    /// Append two differences per byte to `out`, each multiplied by `step`.
    pub fn differences(bytes: &[u8], order: NibbleOrder, step: i32, out: &mut Vec<i32>) {
        out.reserve(bytes.len() * 2);
        for &byte in bytes {
            let [first, second] = Self::ordered(byte, order);
            out.push(first * step);
            out.push(second * step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_worked_example() {
        // 0x98: low nibble 8 -> 0, high nibble 9 -> 1
        assert_eq!(NibbleCodec::split(0x98), (0, 1));
    }

    #[test]
    fn test_split_extremes() {
        assert_eq!(NibbleCodec::split(0x00), (-8, -8));
        assert_eq!(NibbleCodec::split(0xFF), (7, 7));
        assert_eq!(NibbleCodec::split(0x0F), (7, -8));
        assert_eq!(NibbleCodec::split(0xF0), (-8, 7));
    }

    #[test]
    fn test_every_byte_in_range() {
        for byte in 0..=u8::MAX {
            let (low, high) = NibbleCodec::split(byte);
            assert!((-8..=7).contains(&low));
            assert!((-8..=7).contains(&high));
        }
    }

    #[test]
    fn test_order_is_preserved() {
        assert_eq!(NibbleCodec::ordered(0x98, NibbleOrder::LowFirst), [0, 1]);
        assert_eq!(NibbleCodec::ordered(0x98, NibbleOrder::HighFirst), [1, 0]);
    }

    #[test]
    fn test_differences_scaled_by_step() {
        let mut out = Vec::new();
        NibbleCodec::differences(&[0xF0], NibbleOrder::HighFirst, 10, &mut out);
        assert_eq!(out, vec![70, -80]);

        out.clear();
        NibbleCodec::differences(&[0xF0, 0x98], NibbleOrder::LowFirst, 1, &mut out);
        assert_eq!(out, vec![-8, 7, 0, 1]);
    }
}
