//! Audio decoding: DPCM and AQ-DPCM.
//!
//! Both codecs share the same two primitives:
//!
//! - [`NibbleCodec`]: one byte -> two signed 4-bit differences
//! - [`SampleReconstructor`]: differences -> saturated running sum
//!
//! and differ in nibble order, scaling, header and bounds:
//!
//! | Codec | Header | Nibble order | Scale | Bounds |
//! |-------|--------|--------------|-------|--------|
//! | DPCM | none | low, high | 1 | [-128, 127] |
//! | AQ-DPCM | mean, step | high, low | step | [-32000, 32000] + mean |

mod aqdpcm;
mod dpcm;
mod nibble;
pub mod pcm;
mod reconstruct;
pub mod wav;

pub use aqdpcm::{
    AQ_DPCM_RANGE, AqDpcmBlock, AqDpcmDecoder, AqDpcmStream, AudioPacketHeader, PaddingPolicy,
};
pub use dpcm::{DPCM_RANGE, DpcmBlock, DpcmDecoder, DpcmStream};
pub use nibble::{NibbleCodec, NibbleOrder};
pub use reconstruct::{ClampRange, SampleReconstructor, Seed};
pub use wav::{WavSink, WavSpec};
