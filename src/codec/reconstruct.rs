//! Running-sum amplitude reconstruction with saturation.

/// Inclusive amplitude bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampRange {
    /// Lowest representable amplitude.
    pub min: i32,
    /// Highest representable amplitude.
    pub max: i32,
}

impl ClampRange {
    /// Create a range. `min` must not exceed `max`.
    pub const fn new(min: i32, max: i32) -> Self {
        assert!(min <= max, "ClampRange min exceeds max");
        Self { min, max }
    }

    /// Saturate `value` to the range.
    #[inline]
    pub const fn clamp(&self, value: i64) -> i32 {
        if value < self.min as i64 {
            self.min
        } else if value > self.max as i64 {
            self.max
        } else {
            value as i32
        }
    }

    /// Whether `value` lies within the range.
    #[inline]
    pub const fn contains(&self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// How the first sample of a packet is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seed {
    /// Start of a session: the first sample is this value, the first
    /// difference is not applied.
    Origin(i32),
    /// Continuation: the first sample is `clamp(previous + diff[0])`.
    Continue(i32),
}

/// Integrates signed differences into amplitudes.
#[derive(Debug, Clone, Copy)]
pub struct SampleReconstructor {
    range: ClampRange,
}

impl SampleReconstructor {
    /// Create a reconstructor that saturates to `range`.
    pub const fn new(range: ClampRange) -> Self {
        Self { range }
    }

    /// The saturation bounds.
    pub const fn range(&self) -> ClampRange {
        self.range
    }

    /// Append one amplitude per difference to `out`.
    ///
    /// Returns the last amplitude produced, or `None` if `diffs` is empty.
    pub fn reconstruct(&self, seed: Seed, diffs: &[i32], out: &mut Vec<i32>) -> Option<i32> {
        let (&first_diff, rest) = diffs.split_first()?;
        out.reserve(diffs.len());

        let mut prev = match seed {
            Seed::Origin(value) => self.range.clamp(value as i64),
            Seed::Continue(prev) => self.range.clamp(prev as i64 + first_diff as i64),
        };
        out.push(prev);

        for &diff in rest {
            prev = self.range.clamp(prev as i64 + diff as i64);
            out.push(prev);
        }
        Some(prev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DPCM: ClampRange = ClampRange::new(-128, 127);

    #[test]
    fn test_clamp_saturates() {
        assert_eq!(DPCM.clamp(200), 127);
        assert_eq!(DPCM.clamp(-200), -128);
        assert_eq!(DPCM.clamp(5), 5);
        assert_eq!(DPCM.clamp(i64::MAX), 127);
    }

    #[test]
    fn test_clamp_idempotent() {
        for value in [-1000i64, -129, -128, 0, 127, 128, 1000] {
            let once = DPCM.clamp(value);
            assert_eq!(DPCM.clamp(once as i64), once);
            assert!(DPCM.contains(once));
        }
    }

    #[test]
    fn test_origin_ignores_first_difference() {
        let rec = SampleReconstructor::new(DPCM);
        let mut out = Vec::new();
        let last = rec.reconstruct(Seed::Origin(0), &[5, 1, 2], &mut out);

        assert_eq!(out, vec![0, 1, 3]);
        assert_eq!(last, Some(3));
    }

    #[test]
    fn test_continue_applies_first_difference() {
        let rec = SampleReconstructor::new(DPCM);
        let mut out = Vec::new();
        rec.reconstruct(Seed::Continue(10), &[5, -1], &mut out);

        assert_eq!(out, vec![15, 14]);
    }

    #[test]
    fn test_saturation_recovers() {
        let rec = SampleReconstructor::new(DPCM);
        let mut out = Vec::new();
        rec.reconstruct(Seed::Continue(120), &[7, 7, -8], &mut out);

        assert_eq!(out, vec![127, 127, 119]);
    }

    #[test]
    fn test_empty_differences() {
        let rec = SampleReconstructor::new(DPCM);
        let mut out = Vec::new();

        assert_eq!(rec.reconstruct(Seed::Origin(0), &[], &mut out), None);
        assert!(out.is_empty());
    }
}
