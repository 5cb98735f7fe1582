//! Core types shared by every layer: constants, errors, packets, traits.

pub mod constants;
mod error;
mod packet;
mod traits;

pub use error::*;
pub use packet::RawPacket;
pub use traits::PacketDecoder;
