//! Windowed throughput aggregation.
//!
//! A window accumulates received bytes until an observation arrives past
//! `start + duration - margin`. That observation closes the window: the rate
//! over the elapsed time is emitted and a new window starts at its timestamp.
//! The boundary is decided by packet arrival, not by a timer, so real window
//! lengths vary around the nominal duration. The margin closes windows
//! slightly early to absorb scheduling jitter.

use tracing::{debug, warn};

use crate::core::EstimateError;
use crate::core::constants::{
    WINDOW_8S_MARGIN_MS, WINDOW_8S_MS, WINDOW_16S_MARGIN_MS, WINDOW_16S_MS,
    WINDOW_32S_MARGIN_MS, WINDOW_32S_MS,
};

/// Window duration and early-close margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Nominal window length.
    pub duration_ms: u64,
    /// How far before `duration_ms` the window may close.
    pub margin_ms: u64,
}

impl WindowConfig {
    /// Create a window configuration.
    pub const fn new(duration_ms: u64, margin_ms: u64) -> Self {
        Self {
            duration_ms,
            margin_ms,
        }
    }

    /// 8 s window, closes past 7600 ms.
    pub const fn eight_seconds() -> Self {
        Self::new(WINDOW_8S_MS, WINDOW_8S_MARGIN_MS)
    }

    /// 16 s window, closes past 15500 ms.
    pub const fn sixteen_seconds() -> Self {
        Self::new(WINDOW_16S_MS, WINDOW_16S_MARGIN_MS)
    }

    /// 32 s window, closes past 31600 ms.
    pub const fn thirty_two_seconds() -> Self {
        Self::new(WINDOW_32S_MS, WINDOW_32S_MARGIN_MS)
    }

    /// The three reference granularities.
    pub const fn reference_set() -> [Self; 3] {
        [
            Self::eight_seconds(),
            Self::sixteen_seconds(),
            Self::thirty_two_seconds(),
        ]
    }

    /// Offset from the window start past which an observation closes it.
    ///
    /// Negative when the margin exceeds the duration; such a window closes on
    /// observations stamped at or before its own start, which is degenerate.
    pub const fn threshold_ms(&self) -> i64 {
        self.duration_ms as i64 - self.margin_ms as i64
    }
}

/// One emitted rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThroughputSample {
    /// Nominal window duration that produced the sample.
    pub window_ms: u64,
    /// Timestamp of the observation that closed the window.
    pub at_ms: u64,
    /// Actual elapsed window length.
    pub elapsed_ms: u64,
    /// Bytes counted in the window.
    pub bytes: u64,
    /// Rate in bits per second (integer division).
    pub rate_bps: u64,
}

/// Reactive throughput window for one granularity.
#[derive(Debug, Clone)]
pub struct ThroughputWindow {
    config: WindowConfig,
    accumulated_bytes: u64,
    window_start_ms: u64,
}

impl ThroughputWindow {
    /// Create a window that starts at `start_ms` on the session clock.
    pub fn new(config: WindowConfig, start_ms: u64) -> Self {
        Self {
            config,
            accumulated_bytes: 0,
            window_start_ms: start_ms,
        }
    }

    /// Window configuration.
    pub fn config(&self) -> WindowConfig {
        self.config
    }

    /// Bytes counted in the open window.
    pub fn accumulated_bytes(&self) -> u64 {
        self.accumulated_bytes
    }

    /// Start of the open window.
    pub fn window_start_ms(&self) -> u64 {
        self.window_start_ms
    }

    /// Feed one received packet.
    ///
    /// Returns `Ok(Some(_))` when this observation closes the window. The
    /// closing observation's bytes are not counted in either window. On
    /// [`EstimateError::DegenerateWindow`] the state is left untouched.
    pub fn observe(
        &mut self,
        timestamp_ms: u64,
        bytes: u64,
    ) -> Result<Option<ThroughputSample>, EstimateError> {
        let boundary = self.window_start_ms as i128 + self.config.threshold_ms() as i128;
        if timestamp_ms as i128 <= boundary {
            self.accumulated_bytes = self.accumulated_bytes.saturating_add(bytes);
            return Ok(None);
        }

        if timestamp_ms <= self.window_start_ms {
            return Err(EstimateError::DegenerateWindow {
                window_ms: self.config.duration_ms,
                timestamp_ms,
                start_ms: self.window_start_ms,
            });
        }

        let elapsed_ms = timestamp_ms - self.window_start_ms;
        let rate_bps = self.accumulated_bytes.saturating_mul(8 * 1000) / elapsed_ms;
        let sample = ThroughputSample {
            window_ms: self.config.duration_ms,
            at_ms: timestamp_ms,
            elapsed_ms,
            bytes: self.accumulated_bytes,
            rate_bps,
        };

        self.accumulated_bytes = 0;
        self.window_start_ms = timestamp_ms;

        debug!(
            window_ms = sample.window_ms,
            elapsed_ms,
            rate_bps,
            "throughput window closed"
        );
        Ok(Some(sample))
    }
}

/// A set of independent windows fed from the same observation stream.
#[derive(Debug, Clone)]
pub struct ThroughputMonitor {
    windows: Vec<ThroughputWindow>,
}

impl ThroughputMonitor {
    /// Create one window per configuration, all starting at `start_ms`.
    pub fn new(configs: &[WindowConfig], start_ms: u64) -> Self {
        Self {
            windows: configs
                .iter()
                .map(|&config| ThroughputWindow::new(config, start_ms))
                .collect(),
        }
    }

    /// The 8/16/32 s reference windows.
    pub fn reference(start_ms: u64) -> Self {
        Self::new(&WindowConfig::reference_set(), start_ms)
    }

    /// The windows, in configuration order.
    pub fn windows(&self) -> &[ThroughputWindow] {
        &self.windows
    }

    /// Feed one observation to every window.
    ///
    /// Returns the samples emitted by this observation. A degenerate window
    /// is logged and skipped; the other windows still see the observation.
    pub fn observe(&mut self, timestamp_ms: u64, bytes: u64) -> Vec<ThroughputSample> {
        let mut emitted = Vec::new();
        for window in &mut self.windows {
            match window.observe(timestamp_ms, bytes) {
                Ok(Some(sample)) => emitted.push(sample),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "skipping throughput emission"),
            }
        }
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_thresholds() {
        assert_eq!(WindowConfig::eight_seconds().threshold_ms(), 7600);
        assert_eq!(WindowConfig::sixteen_seconds().threshold_ms(), 15500);
        assert_eq!(WindowConfig::thirty_two_seconds().threshold_ms(), 31600);
    }

    #[test]
    fn test_concrete_eight_second_case() {
        let mut window = ThroughputWindow::new(WindowConfig::eight_seconds(), 0);

        for i in 0..8 {
            assert_eq!(window.observe(i * 1000, 32), Ok(None));
        }
        assert_eq!(window.accumulated_bytes(), 256);

        let sample = window.observe(8000, 32).unwrap().unwrap();
        assert_eq!(sample.rate_bps, 256);
        assert_eq!(sample.elapsed_ms, 8000);
        assert_eq!(sample.bytes, 256);

        // Closing observation is not carried into the new window.
        assert_eq!(window.accumulated_bytes(), 0);
        assert_eq!(window.window_start_ms(), 8000);
    }

    #[test]
    fn test_margin_closes_early() {
        let mut window = ThroughputWindow::new(WindowConfig::new(8000, 400), 0);
        assert_eq!(window.observe(7600, 100), Ok(None));

        let sample = window.observe(7601, 100).unwrap().unwrap();
        assert_eq!(sample.bytes, 100);
        assert_eq!(sample.rate_bps, 100 * 8 * 1000 / 7601);
    }

    #[test]
    fn test_long_gap_tolerated() {
        let mut window = ThroughputWindow::new(WindowConfig::eight_seconds(), 0);
        window.observe(1000, 1000).unwrap();

        let sample = window.observe(60_000, 32).unwrap().unwrap();
        assert_eq!(sample.rate_bps, 1000 * 8 * 1000 / 60_000);
    }

    #[test]
    fn test_degenerate_window() {
        // Margin past the duration: the boundary sits 300 ms before the start.
        let mut window = ThroughputWindow::new(WindowConfig::new(100, 400), 5000);
        assert_eq!(window.observe(4600, 10), Ok(None));

        assert_eq!(
            window.observe(5000, 10),
            Err(EstimateError::DegenerateWindow {
                window_ms: 100,
                timestamp_ms: 5000,
                start_ms: 5000,
            })
        );
        assert_eq!(window.accumulated_bytes(), 10);
        assert_eq!(window.window_start_ms(), 5000);

        let sample = window.observe(5100, 10).unwrap().unwrap();
        assert_eq!(sample.rate_bps, 10 * 8 * 1000 / 100);
    }

    #[test]
    fn test_monitor_skips_degenerate_window() {
        let configs = [WindowConfig::new(100, 400), WindowConfig::eight_seconds()];
        let mut monitor = ThroughputMonitor::new(&configs, 1000);

        assert!(monitor.observe(1000, 32).is_empty());
        assert_eq!(monitor.windows()[1].accumulated_bytes(), 32);
    }

    #[test]
    fn test_monitor_runs_windows_independently() {
        let mut monitor = ThroughputMonitor::reference(0);
        let mut emitted = Vec::new();

        // One 32-byte echo per second for 40 s.
        for t in 1..=40u64 {
            emitted.extend(monitor.observe(t * 1000, 32));
        }

        let eights: Vec<_> = emitted.iter().filter(|s| s.window_ms == 8000).collect();
        let sixteens: Vec<_> = emitted.iter().filter(|s| s.window_ms == 16000).collect();
        let thirty_twos: Vec<_> = emitted.iter().filter(|s| s.window_ms == 32000).collect();

        assert_eq!(eights.len(), 5);
        assert_eq!(sixteens.len(), 2);
        assert_eq!(thirty_twos.len(), 1);

        // First 8 s window: t = 1..=7 counted, closed at 8000.
        assert_eq!(eights[0].bytes, 7 * 32);
        assert_eq!(eights[0].rate_bps, 7 * 32 * 8 * 1000 / 8000);
    }
}
