//! Optional post-processing passes over a loaded dataset.
//!
//! Filters always run against the dataset as loaded, never against an
//! already-filtered one, so toggling a filter off restores the samples.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::Dataset;
use crate::error::SegResult;

/// Zero-based position of the last surviving row in the pen-up run before a
/// removed stroke.
const MAX_TRAILING_LIFT_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub remove_edge_lifts: bool,
    pub remove_last_stroke: bool,
    pub show_lifts: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            remove_edge_lifts: false,
            remove_last_stroke: false,
            show_lifts: true,
        }
    }
}

impl FilterSettings {
    /// Applies the enabled filters in load order: last stroke, then edge lifts.
    pub fn apply(&self, base: &Dataset) -> SegResult<Dataset> {
        let mut current = base.clone();
        if self.remove_last_stroke {
            current = retain_or_skip(current, remove_last_stroke, "remove_last_stroke")?;
        }
        if self.remove_edge_lifts {
            current = retain_or_skip(current, remove_edge_lifts, "remove_edge_lifts")?;
        }
        Ok(current)
    }
}

fn retain_or_skip(
    dataset: Dataset,
    filter: fn(&Dataset) -> Vec<usize>,
    name: &'static str,
) -> SegResult<Dataset> {
    let keep = filter(&dataset);
    if keep.is_empty() {
        warn!(filter = name, "filter would remove every sample; skipped");
        return Ok(dataset);
    }
    if keep.len() == dataset.len() {
        return Ok(dataset);
    }
    debug!(
        filter = name,
        before = dataset.len(),
        after = keep.len(),
        "filter applied"
    );
    dataset.retain_indices(&keep)
}

/// Indices kept after dropping the final stroke.
///
/// The final pen-down run is removed together with every directly preceding
/// run whose centroid lies closer to the final run than to its own
/// predecessor. The pen-up run before the removed strokes is then trimmed
/// at a time slip and cut after its row at position ten.
#[must_use]
pub fn remove_last_stroke(dataset: &Dataset) -> Vec<usize> {
    let tip = dataset.tip();
    let tip_seg = dataset.tip_seg();
    let time_seg = dataset.time_seg();
    let all: Vec<usize> = (0..dataset.len()).collect();

    let mut strokes: Vec<u32> = Vec::new();
    for (&seg, _) in tip_seg.iter().zip(tip).filter(|(_, down)| **down) {
        if strokes.last() != Some(&seg) {
            strokes.push(seg);
        }
    }
    let Some(&last) = strokes.last() else {
        return all;
    };

    let centroid = |seg: u32| {
        let (mut sx, mut sy, mut n) = (0.0, 0.0, 0.0);
        for i in (0..dataset.len()).filter(|&i| tip_seg[i] == seg) {
            sx += dataset.x()[i];
            sy += dataset.y()[i];
            n += 1.0;
        }
        (sx / n, sy / n)
    };
    let distance = |a: (f64, f64), b: (f64, f64)| (a.0 - b.0).hypot(a.1 - b.1);

    let last_mean = centroid(last);
    let mut first_removed = last;
    let mut k = strokes.len().saturating_sub(2);
    while k >= 1 {
        let here = centroid(strokes[k]);
        let previous = centroid(strokes[k - 1]);
        if distance(last_mean, here) < distance(previous, here) {
            first_removed = strokes[k];
            k -= 1;
        } else {
            break;
        }
    }

    let Some(lift) = first_removed.checked_sub(1).filter(|&s| s > 0) else {
        warn!("no pen-up run precedes the last stroke; nothing removed");
        return all;
    };

    let mut kept = all;
    let lift_time_segs: Vec<u32> = kept
        .iter()
        .filter(|&&i| tip_seg[i] == lift)
        .map(|&i| time_seg[i])
        .collect();
    let first_ts = lift_time_segs.iter().copied().min();
    let spans_slip = lift_time_segs.iter().any(|&ts| Some(ts) != first_ts);
    if let (true, Some(limit)) = (spans_slip, first_ts) {
        kept.retain(|&i| time_seg[i] <= limit);
    }

    let lift_positions: Vec<usize> = kept
        .iter()
        .enumerate()
        .filter(|(_, i)| tip_seg[**i] == lift)
        .map(|(p, _)| p)
        .collect();
    let last_keep = if lift_positions.len() > MAX_TRAILING_LIFT_ROWS {
        lift_positions.get(MAX_TRAILING_LIFT_ROWS).copied()
    } else {
        lift_positions.last().copied()
    };
    match last_keep {
        Some(p) => {
            kept.truncate(p + 1);
            kept
        }
        None => (0..dataset.len()).collect(),
    }
}

/// Indices kept after dropping the first and last pen-up runs.
#[must_use]
pub fn remove_edge_lifts(dataset: &Dataset) -> Vec<usize> {
    let tip = dataset.tip();
    let tip_seg = dataset.tip_seg();
    let lifts = tip_seg
        .iter()
        .zip(tip)
        .filter(|(_, down)| !**down)
        .map(|(&seg, _)| seg);
    let (Some(first), Some(last)) = (lifts.clone().min(), lifts.max()) else {
        return (0..dataset.len()).collect();
    };
    (0..dataset.len())
        .filter(|&i| tip_seg[i] != first && tip_seg[i] != last)
        .collect()
}
