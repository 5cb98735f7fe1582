//! RTT estimation and round-trip timing.
//!
//! Smoothed RTT, mean deviation and retransmission timeout, computed by
//! exponential smoothing over echo round trips:
//!
//! ```text
//! first sample r0:  srtt = r0               dev = r0 / 2
//! then, for r:      srtt = a*srtt + (1-a)*r  dev = b*dev + (1-b)*|srtt - r|
//! always:           rto  = srtt + c*dev
//! ```

use std::time::Duration;

use tracing::trace;

use crate::core::constants::{DEVIATION_BETA, RTO_K, SRTT_ALPHA};

/// Smoothing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttParams {
    /// Weight of the previous SRTT (`a`).
    pub alpha: f64,
    /// Weight of the previous mean deviation (`b`).
    pub beta: f64,
    /// Deviation multiplier in the RTO (`c`).
    pub k: f64,
}

impl Default for RttParams {
    fn default() -> Self {
        Self {
            alpha: SRTT_ALPHA,
            beta: DEVIATION_BETA,
            k: RTO_K,
        }
    }
}

/// Estimator state after one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RttSample {
    /// The observed round trip in milliseconds.
    pub rtt_ms: u64,
    /// Smoothed RTT in milliseconds.
    pub srtt: f64,
    /// Mean deviation in milliseconds.
    pub mean_deviation: f64,
    /// Retransmission timeout in milliseconds.
    pub rto: f64,
}

/// Running RTT estimator for one session.
#[derive(Debug, Clone)]
pub struct RttEstimator {
    params: RttParams,
    /// Smoothed RTT in milliseconds.
    srtt: f64,
    /// Mean deviation in milliseconds.
    mean_deviation: f64,
    /// Retransmission timeout in milliseconds.
    rto: f64,
    /// Observations consumed so far.
    samples: u64,
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RttEstimator {
    /// Create an estimator with the lab's smoothing constants.
    pub fn new() -> Self {
        Self::with_params(RttParams::default())
    }

    /// Create an estimator with custom smoothing constants.
    pub fn with_params(params: RttParams) -> Self {
        Self {
            params,
            srtt: 0.0,
            mean_deviation: 0.0,
            rto: 0.0,
            samples: 0,
        }
    }

    /// Feed one round trip and return the updated state.
    pub fn update(&mut self, rtt_ms: u64) -> RttSample {
        let r = rtt_ms as f64;
        let RttParams { alpha, beta, k } = self.params;

        if self.samples == 0 {
            // First measurement; the deviation seed is an integer halving.
            self.srtt = r;
            self.mean_deviation = (rtt_ms / 2) as f64;
        } else {
            self.srtt = alpha * self.srtt + (1.0 - alpha) * r;
            self.mean_deviation =
                beta * self.mean_deviation + (1.0 - beta) * (self.srtt - r).abs();
        }
        self.rto = self.srtt + k * self.mean_deviation;
        self.samples += 1;

        trace!(
            rtt_ms,
            srtt = self.srtt,
            dev = self.mean_deviation,
            rto = self.rto,
            "rtt update"
        );

        self.sample(rtt_ms)
    }

    /// Feed a slice of round trips in order.
    pub fn extend(&mut self, rtts_ms: &[u64]) -> Vec<RttSample> {
        rtts_ms.iter().map(|&r| self.update(r)).collect()
    }

    /// Estimate a whole series with a fresh estimator.
    pub fn estimate_series(rtts_ms: &[u64], params: RttParams) -> Vec<RttSample> {
        Self::with_params(params).extend(rtts_ms)
    }

    fn sample(&self, rtt_ms: u64) -> RttSample {
        RttSample {
            rtt_ms,
            srtt: self.srtt,
            mean_deviation: self.mean_deviation,
            rto: self.rto,
        }
    }

    /// Check if the estimator has seen at least one observation.
    pub fn is_initialized(&self) -> bool {
        self.samples > 0
    }

    /// Number of observations consumed.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Smoothing parameters in use.
    pub fn params(&self) -> RttParams {
        self.params
    }

    /// Get the current smoothed RTT in milliseconds.
    pub fn srtt_ms(&self) -> f64 {
        self.srtt
    }

    /// Get the current mean deviation in milliseconds.
    pub fn mean_deviation_ms(&self) -> f64 {
        self.mean_deviation
    }

    /// Get the current retransmission timeout in milliseconds.
    pub fn rto_ms(&self) -> f64 {
        self.rto
    }

    /// Get the current smoothed RTT.
    pub fn srtt(&self) -> Duration {
        Duration::from_secs_f64(self.srtt / 1000.0)
    }

    /// Get the current retransmission timeout.
    pub fn rto(&self) -> Duration {
        Duration::from_secs_f64(self.rto / 1000.0)
    }
}

/// Pairs a sent request with its reply to produce round-trip times.
///
/// Times are milliseconds on the caller's session clock.
#[derive(Debug, Clone, Default)]
pub struct RoundTripTimer {
    /// When the outstanding request was sent.
    pending_since_ms: Option<u64>,
}

impl RoundTripTimer {
    /// Create a timer with nothing outstanding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a request was sent at `now_ms`.
    pub fn on_send(&mut self, now_ms: u64) {
        self.pending_since_ms = Some(now_ms);
    }

    /// Record a reply at `now_ms`.
    ///
    /// Returns the round trip if a request was outstanding.
    pub fn on_receive(&mut self, now_ms: u64) -> Option<u64> {
        let sent = self.pending_since_ms.take()?;
        Some(now_ms.saturating_sub(sent))
    }

    /// Forget the outstanding request (e.g., after a receive timeout).
    pub fn clear_pending(&mut self) {
        self.pending_since_ms = None;
    }

    /// Whether a request is waiting for its reply.
    pub fn is_pending(&self) -> bool {
        self.pending_since_ms.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_rtt_estimator_initial() {
        let estimator = RttEstimator::new();
        assert!(!estimator.is_initialized());
        assert_eq!(estimator.params(), RttParams::default());
    }

    #[test]
    fn test_rtt_estimator_first_sample() {
        let mut estimator = RttEstimator::new();
        let sample = estimator.update(100);

        assert!(estimator.is_initialized());
        assert!(close(sample.srtt, 100.0));
        assert!(close(sample.mean_deviation, 50.0));
        assert!(close(sample.rto, 300.0));
    }

    #[test]
    fn test_first_sample_halves_as_integer() {
        let mut estimator = RttEstimator::new();
        let sample = estimator.update(101);

        assert!(close(sample.mean_deviation, 50.0));
        assert!(close(sample.rto, 301.0));
    }

    #[test]
    fn test_rtt_recurrence_concrete_case() {
        let samples = RttEstimator::estimate_series(&[100, 120, 90], RttParams::default());

        let srtt: Vec<f64> = samples.iter().map(|s| s.srtt).collect();
        let dev: Vec<f64> = samples.iter().map(|s| s.mean_deviation).collect();
        let rto: Vec<f64> = samples.iter().map(|s| s.rto).collect();

        for (got, want) in srtt.iter().zip([100.0, 102.0, 100.8]) {
            assert!(close(*got, want), "srtt {got} != {want}");
        }
        for (got, want) in dev.iter().zip([50.0, 42.0, 34.2]) {
            assert!(close(*got, want), "dev {got} != {want}");
        }
        for (got, want) in rto.iter().zip([300.0, 270.0, 237.6]) {
            assert!(close(*got, want), "rto {got} != {want}");
        }
        assert_eq!(samples[2].rtt_ms, 90);
    }

    #[test]
    fn test_order_matters() {
        let a = RttEstimator::estimate_series(&[100, 120, 90], RttParams::default());
        let b = RttEstimator::estimate_series(&[90, 120, 100], RttParams::default());
        assert!(!close(a[2].srtt, b[2].srtt));
    }

    #[test]
    fn test_custom_params() {
        let params = RttParams {
            alpha: 0.875,
            beta: 0.75,
            k: 4.0,
        };
        let mut estimator = RttEstimator::with_params(params);
        estimator.update(100);
        let sample = estimator.update(200);

        assert!(close(sample.srtt, 112.5));
    }

    #[test]
    fn test_duration_accessors() {
        let mut estimator = RttEstimator::new();
        estimator.update(100);

        assert!((estimator.srtt().as_secs_f64() - 0.1).abs() < 1e-6);
        assert!((estimator.rto().as_secs_f64() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_round_trip_timer() {
        let mut timer = RoundTripTimer::new();
        assert_eq!(timer.on_receive(50), None);

        timer.on_send(1000);
        assert!(timer.is_pending());
        assert_eq!(timer.on_receive(1042), Some(42));
        assert!(!timer.is_pending());
        assert_eq!(timer.on_receive(1100), None);
    }

    #[test]
    fn test_round_trip_timer_clear() {
        let mut timer = RoundTripTimer::new();
        timer.on_send(10);
        timer.clear_pending();
        assert_eq!(timer.on_receive(20), None);
    }
}
