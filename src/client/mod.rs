//! Lab client library.
//!
//! High-level API that runs whole lab sessions over [`crate::transport`].

#[allow(clippy::module_inception)]
mod client;
mod config;

pub use client::*;
pub use config::*;
