//! Latency and throughput estimation.
//!
//! - [`RttEstimator`]: SRTT / mean deviation / RTO by exponential smoothing
//! - [`ThroughputWindow`]: reactive rate windows (8/16/32 s by default)
//! - [`EchoRecorder`]: both, fed from one stream of echo replies
//!
//! All estimators are synchronous and owned by one session. They tolerate
//! arbitrarily long gaps between observations.

mod echo;
mod throughput;
mod timing;

pub use echo::{EchoRecorder, EchoReport};
pub use throughput::{ThroughputMonitor, ThroughputSample, ThroughputWindow, WindowConfig};
pub use timing::{RoundTripTimer, RttEstimator, RttParams, RttSample};
