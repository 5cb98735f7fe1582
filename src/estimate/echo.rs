//! Echo session bookkeeping: one RTT estimator plus a set of throughput
//! windows fed from the same stream of echo replies.

use super::throughput::{ThroughputMonitor, ThroughputSample, WindowConfig};
use super::timing::{RttEstimator, RttParams, RttSample};

/// Everything measured during an echo session.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EchoReport {
    /// Estimator state after each reply, in arrival order.
    pub rtt: Vec<RttSample>,
    /// Rates emitted by every window, in emission order.
    pub throughput: Vec<ThroughputSample>,
    /// Requests sent.
    pub sent: u64,
    /// Requests that timed out.
    pub lost: u64,
}

impl EchoReport {
    /// Raw round trips in arrival order.
    pub fn rtts_ms(&self) -> Vec<u64> {
        self.rtt.iter().map(|s| s.rtt_ms).collect()
    }

    /// Rates emitted by the window of the given nominal duration.
    pub fn rates_for(&self, window_ms: u64) -> Vec<u64> {
        self.throughput
            .iter()
            .filter(|s| s.window_ms == window_ms)
            .map(|s| s.rate_bps)
            .collect()
    }
}

/// Feeds echo replies into the estimators and collects a report.
#[derive(Debug, Clone)]
pub struct EchoRecorder {
    rtt: RttEstimator,
    throughput: ThroughputMonitor,
    report: EchoReport,
}

impl EchoRecorder {
    /// Create a recorder whose windows start at `start_ms`.
    pub fn new(params: RttParams, windows: &[WindowConfig], start_ms: u64) -> Self {
        Self {
            rtt: RttEstimator::with_params(params),
            throughput: ThroughputMonitor::new(windows, start_ms),
            report: EchoReport::default(),
        }
    }

    /// Recorder with the reference constants and 8/16/32 s windows.
    pub fn reference(start_ms: u64) -> Self {
        Self::new(RttParams::default(), &WindowConfig::reference_set(), start_ms)
    }

    /// Count a request that was sent.
    pub fn on_sent(&mut self) {
        self.report.sent += 1;
    }

    /// Count a request whose reply never arrived.
    pub fn on_lost(&mut self) {
        self.report.lost += 1;
    }

    /// Record a reply of `bytes` that arrived at `received_at_ms` after a
    /// round trip of `rtt_ms`.
    pub fn on_reply(&mut self, received_at_ms: u64, rtt_ms: u64, bytes: u64) -> RttSample {
        self.report
            .throughput
            .extend(self.throughput.observe(received_at_ms, bytes));
        let sample = self.rtt.update(rtt_ms);
        self.report.rtt.push(sample);
        sample
    }

    /// Current estimator.
    pub fn estimator(&self) -> &RttEstimator {
        &self.rtt
    }

    /// Report so far.
    pub fn report(&self) -> &EchoReport {
        &self.report
    }

    /// Finish the session.
    pub fn finish(self) -> EchoReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_collects_series() {
        let mut recorder = EchoRecorder::reference(0);

        for (i, rtt) in [100u64, 120, 90].iter().enumerate() {
            recorder.on_sent();
            recorder.on_reply((i as u64 + 1) * 1000, *rtt, 32);
        }
        recorder.on_sent();
        recorder.on_lost();

        let report = recorder.finish();
        assert_eq!(report.rtts_ms(), vec![100, 120, 90]);
        assert_eq!(report.sent, 4);
        assert_eq!(report.lost, 1);
        assert!(report.throughput.is_empty());
        assert!((report.rtt[2].rto - 237.6).abs() < 1e-9);
    }

    #[test]
    fn test_recorder_rates_per_window() {
        let mut recorder = EchoRecorder::reference(0);
        for t in 1..=17u64 {
            recorder.on_reply(t * 1000, 40, 32);
        }

        let report = recorder.report();
        assert_eq!(report.rates_for(8000), vec![224, 224]);
        assert_eq!(report.rates_for(16000), vec![15 * 32 * 8 * 1000 / 16000]);
        assert!(report.rates_for(32000).is_empty());
    }
}
