//! Lab transport.
//!
//! - **UDP**: [`LabSocket`] sends request datagrams and receives replies as
//!   owned [`RawPacket`](crate::core::RawPacket)s, with a per-receive timeout
//! - **TCP**: [`LineLink`] exchanges request lines and terminator-delimited
//!   replies with the copter autopilot and the vehicle
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Lab client sessions             │
//! ├─────────────────────────────────────────┤
//! │         Transport                       │  ← This module
//! │   requests, replies, session clock      │
//! ├─────────────────────────────────────────┤
//! │         UDP / TCP                       │
//! └─────────────────────────────────────────┘
//! ```

mod error;
mod socket;
mod tcp;

pub use error::*;
pub use socket::*;
pub use tcp::LineLink;
