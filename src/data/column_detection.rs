//! Maps arbitrary tabular columns onto canonical X, Y, Z, pressure and time.
//!
//! Direct name matches are tried first. When any role is still unresolved a
//! statistical fallback runs over per-column sample-to-sample differences,
//! pen-down runs and time-correlated slopes.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::stats::{diffs, lin_r2, lin_slope, max_of, mean, median, min_of, quantile, run_length_ids, sd};
use crate::data::NumericTable;
use crate::error::{SegError, SegResult};

const X_NAMES: &[&str] = &["x", "X"];
const Y_NAMES: &[&str] = &["y", "Y"];
const Z_NAMES: &[&str] = &["z", "Z"];
pub const TIME_NAMES: &[&str] = &["t", "T", "Time_MS", "time", "Time", "device_time"];
const PRESSURE_NAMES: &[&str] = &["P", "pressure", "Pressure"];
const INDEX_NAMES: &[&str] = &[
    "index", "Index", "ind", "Ind", "eventid", "eventID", "eventId", "EventID", "EventId",
    "Eventid", "event_id", "event_ID", "Event_id", "Event_ID", "Event_Id", "event_Id",
];

/// Column positions assigned to each role. `None` means unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectedColumns {
    pub x: Option<usize>,
    pub y: Option<usize>,
    pub z: Option<usize>,
    pub pressure: Option<usize>,
    pub time: Option<usize>,
    pub index: Option<usize>,
}

impl DetectedColumns {
    fn assigned(&self) -> HashSet<usize> {
        [self.x, self.y, self.z, self.pressure, self.time, self.index]
            .into_iter()
            .flatten()
            .collect()
    }

    fn is_complete(&self) -> bool {
        [self.x, self.y, self.z, self.pressure, self.time, self.index]
            .iter()
            .all(Option::is_some)
    }

    /// Roles the canonical fields cannot do without.
    pub fn require_canonical(&self) -> SegResult<CanonicalColumns> {
        match (self.x, self.y, self.pressure, self.time) {
            (Some(x), Some(y), Some(pressure), Some(time)) => Ok(CanonicalColumns {
                x,
                y,
                z: self.z,
                pressure,
                time,
            }),
            _ => Err(SegError::UnsupportedFormat(format!(
                "could not resolve X/Y/pressure/time columns (detected: {self:?})"
            ))),
        }
    }
}

/// Fully resolved mandatory roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalColumns {
    pub x: usize,
    pub y: usize,
    pub z: Option<usize>,
    pub pressure: usize,
    pub time: usize,
}

/// Per-column statistics of consecutive differences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffStats {
    pub mean: f64,
    pub sd: f64,
    pub median: f64,
    pub iqr: f64,
    pub range: f64,
}

impl DiffStats {
    #[must_use]
    pub fn of(values: &[f64]) -> Self {
        let d = diffs(values);
        Self {
            mean: mean(&d),
            sd: sd(&d),
            median: median(&d),
            iqr: quantile(&d, 0.75) - quantile(&d, 0.25),
            range: max_of(&d) - min_of(&d),
        }
    }
}

fn find_by_name(names: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|c| names.iter().position(|n| n == c))
}

/// Resolves column roles, dropping sentinel rows when the heuristic runs.
///
/// Returns the detected roles; `table` is left with only the rows the
/// detector accepted (its `row_ids` map back to the source rows).
pub fn detect_columns(table: &mut NumericTable) -> DetectedColumns {
    let names = table.names().to_vec();
    let mut found = DetectedColumns {
        x: find_by_name(&names, X_NAMES),
        y: find_by_name(&names, Y_NAMES),
        z: find_by_name(&names, Z_NAMES),
        pressure: find_by_name(&names, PRESSURE_NAMES),
        time: find_by_name(&names, TIME_NAMES),
        index: find_by_name(&names, INDEX_NAMES),
    };
    if found.is_complete() {
        debug!(?found, "columns resolved by name");
        return found;
    }

    drop_negative_rows(table);
    let n_cols = table.n_cols();
    let stats: Vec<DiffStats> = (0..n_cols).map(|j| DiffStats::of(table.column(j))).collect();

    if found.index.is_none() {
        found.index = detect_index(&stats, &found.assigned());
    }
    if found.time.is_none() {
        found.time = detect_time(table, &stats, found.index);
    }
    if found.pressure.is_none() {
        found.pressure = detect_pressure(table, &found);
    }

    let tip: Vec<bool> = match found.pressure {
        Some(p) => table.column(p).iter().map(|&v| v > 0.0).collect(),
        None => vec![false; table.n_rows()],
    };
    let tip_seg = run_length_ids(&tip);

    if found.z.is_none() {
        found.z = detect_z(table, &found, &tip);
    }
    if found.x.is_none() || found.y.is_none() {
        detect_xy(table, &mut found, &tip, &tip_seg);
    }

    debug!(?found, rows = table.n_rows(), "columns resolved by heuristic");
    found
}

/// Rows with a negative value in any column whose minimum is negative are
/// treated as sentinel/error rows.
fn drop_negative_rows(table: &mut NumericTable) {
    let mut negative = vec![false; table.n_rows()];
    for j in 0..table.n_cols() {
        let column = table.column(j);
        if min_of(column) < 0.0 {
            for (i, &v) in column.iter().enumerate() {
                if v < 0.0 {
                    negative[i] = true;
                }
            }
        }
    }
    let dropped = negative.iter().filter(|&&n| n).count();
    if dropped > 0 {
        debug!(dropped, "dropping rows with negative sentinel values");
        table.retain_rows(|i| !negative[i]);
    }
}

/// Steadiest unassigned column, provided it actually moves.
fn detect_index(stats: &[DiffStats], taken: &HashSet<usize>) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (j, s) in stats.iter().enumerate().filter(|(j, _)| !taken.contains(j)) {
        if best.is_none_or(|b| s.range < stats[b].range) {
            best = Some(j);
        }
    }
    let best = best?;
    let median = stats[best].median;
    (median != 0.0 && !median.is_nan()).then_some(best)
}

fn detect_time(table: &NumericTable, stats: &[DiffStats], index: Option<usize>) -> Option<usize> {
    let candidates: Vec<usize> = stats
        .iter()
        .enumerate()
        .filter(|(j, s)| s.median > 0.0 && Some(*j) != index)
        .map(|(j, _)| j)
        .collect();

    match candidates.as_slice() {
        [] => None,
        [only] => Some(*only),
        many => {
            let order: Vec<f64> = (0..table.n_rows()).map(|i| i as f64).collect();
            let mut best = many[0];
            let mut best_score = lin_r2(&order, table.column(best));
            for &j in &many[1..] {
                let score = lin_r2(&order, table.column(j));
                if score > best_score {
                    best = j;
                    best_score = score;
                }
            }
            Some(best)
        }
    }
}

fn remaining(table: &NumericTable, found: &DetectedColumns) -> Vec<usize> {
    let taken = found.assigned();
    (0..table.n_cols()).filter(|j| !taken.contains(j)).collect()
}

fn detect_pressure(table: &NumericTable, found: &DetectedColumns) -> Option<usize> {
    remaining(table, found)
        .into_iter()
        .filter(|&j| min_of(table.column(j)) == 0.0)
        .fold(None, |best: Option<usize>, j| match best {
            Some(b) if max_of(table.column(b)) >= max_of(table.column(j)) => Some(b),
            _ => Some(j),
        })
}

fn detect_z(table: &NumericTable, found: &DetectedColumns, tip: &[bool]) -> Option<usize> {
    remaining(table, found).into_iter().find(|&j| {
        table
            .column(j)
            .iter()
            .zip(tip)
            .filter(|(_, down)| **down)
            .all(|(&v, _)| v == 0.0)
    })
}

fn detect_xy(table: &NumericTable, found: &mut DetectedColumns, tip: &[bool], tip_seg: &[u32]) {
    let rem = remaining(table, found);

    let before_z = found.z.and_then(|z| {
        let (c1, c2) = (z.checked_sub(2)?, z.checked_sub(1)?);
        (rem.contains(&c1) && rem.contains(&c2)).then_some((c1, c2))
    });
    let Some((c1, c2)) = before_z.or_else(|| {
        rem.windows(2)
            .find(|w| w[1] - w[0] == 1)
            .map(|w| (w[0], w[1]))
    }) else {
        warn!("no adjacent column pair left for X/Y");
        return;
    };

    // Pen-down run lengths keyed by run id, ascending.
    let mut run_lengths: BTreeMap<u32, usize> = BTreeMap::new();
    for (&seg, _) in tip_seg.iter().zip(tip).filter(|(_, down)| **down) {
        *run_lengths.entry(seg).or_insert(0) += 1;
    }
    let lengths: Vec<f64> = run_lengths.values().map(|&n| n as f64).collect();
    let threshold = if lengths.len() > 3 {
        median(&lengths)
    } else {
        min_of(&lengths)
    };
    let long_runs: Vec<u32> = run_lengths
        .iter()
        .filter(|(_, n)| **n as f64 > threshold)
        .map(|(&seg, _)| seg)
        .collect();

    let Some(time_col) = found.time.filter(|_| !long_runs.is_empty()) else {
        warn!(first = c1, second = c2, "no long pen-down runs; keeping column order for X/Y");
        found.x = Some(c1);
        found.y = Some(c2);
        return;
    };

    let (mut positive_first, mut positive_second) = (0, 0);
    for seg in long_runs {
        let rows: Vec<usize> = (0..tip.len())
            .filter(|&i| tip[i] && tip_seg[i] == seg)
            .collect();
        let pick = |col: usize| rows.iter().map(|&i| table.value(col, i)).collect::<Vec<_>>();
        let t = pick(time_col);
        if lin_slope(&t, &pick(c1)) > 0.0 {
            positive_first += 1;
        }
        if lin_slope(&t, &pick(c2)) > 0.0 {
            positive_second += 1;
        }
    }

    if positive_first >= positive_second {
        found.x = Some(c1);
        found.y = Some(c2);
    } else {
        found.x = Some(c2);
        found.y = Some(c1);
    }
}
