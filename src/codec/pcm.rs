//! Linear PCM buffers for playback or storage (8 kHz, mono, signed).
//!
//! [`super::wav`] wraps these in a WAV container.

/// Encode 8-bit signed samples as raw PCM bytes.
pub fn encode_pcm8(samples: &[i8]) -> Vec<u8> {
    samples.iter().map(|&s| s as u8).collect()
}

/// Encode samples as 16-bit little-endian PCM, saturating to `i16`.
///
/// AQ-DPCM samples carry the packet mean and may leave the `i16` range.
pub fn encode_pcm16_le(samples: &[i32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        out.extend_from_slice(&clamped.to_le_bytes());
    }
    out
}
