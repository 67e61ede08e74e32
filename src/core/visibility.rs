use serde::{Deserialize, Serialize};

use crate::core::TimeRange;
use crate::core::stats::quantile;

/// Pen-lift visibility policy shared by the XY view and the brush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityPolicy {
    pub show_lifts: bool,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self { show_lifts: true }
    }
}

impl VisibilityPolicy {
    /// Sample indices drawn in the XY view: all, or pen-down only.
    #[must_use]
    pub fn visible_indices(self, tip: &[bool]) -> Vec<usize> {
        if self.show_lifts {
            return (0..tip.len()).collect();
        }
        tip.iter()
            .enumerate()
            .filter_map(|(i, &down)| down.then_some(i))
            .collect()
    }
}

/// Intervals `[T[i], T[i+1]]` whose gap is an outlier (`> Q3 + 1.5 IQR` of
/// all gaps). Needs at least three samples.
#[must_use]
pub fn detect_time_gaps(times: &[f64]) -> Vec<TimeRange> {
    if times.len() < 3 {
        return Vec::new();
    }
    let gaps: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
    let q1 = quantile(&gaps, 0.25);
    let q3 = quantile(&gaps, 0.75);
    let threshold = q3 + 1.5 * (q3 - q1);
    if !threshold.is_finite() {
        return Vec::new();
    }
    gaps.iter()
        .enumerate()
        .filter(|(_, gap)| **gap > threshold)
        .map(|(i, _)| TimeRange {
            t0: times[i],
            t1: times[i + 1],
        })
        .collect()
}

/// Clamps highlight ranges into `[t_min, t_max]`, drops empty ones and
/// coalesces overlaps, ordered by start.
#[must_use]
pub fn merge_highlight_ranges(ranges: &[TimeRange], t_min: f64, t_max: f64) -> Vec<TimeRange> {
    if !(t_max >= t_min) {
        return Vec::new();
    }
    let mut segs: Vec<TimeRange> = ranges
        .iter()
        .map(|r| TimeRange {
            t0: r.t0.clamp(t_min, t_max),
            t1: r.t1.clamp(t_min, t_max),
        })
        .filter(|r| r.t1 > r.t0)
        .collect();
    segs.sort_by(|a, b| a.t0.total_cmp(&b.t0));

    let mut merged: Vec<TimeRange> = Vec::with_capacity(segs.len());
    for seg in segs {
        match merged.last_mut() {
            Some(cur) if seg.t0 <= cur.t1 => cur.t1 = cur.t1.max(seg.t1),
            _ => merged.push(seg),
        }
    }
    merged
}
