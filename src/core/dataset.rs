use serde_json::{Number, Value};
use tracing::{debug, warn};

use crate::core::stats::{median, run_length_ids};
use crate::data::RawRow;
use crate::error::{SegError, SegResult};

/// One sample after column detection, before time normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub pressure: f64,
    /// Raw (un-normalized) time.
    pub time: f64,
    /// Untouched source row, exported verbatim.
    pub row: RawRow,
}

/// Immutable per-load sample buffers.
///
/// A `Dataset` is rebuilt wholesale on every load or filter change and is
/// never patched in place; consumers hold it behind an `Arc` handed out by
/// the session. All vectors are parallel and ordered by time.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    pressure: Vec<f64>,
    t: Vec<f64>,
    dt: Vec<f64>,
    tip: Vec<bool>,
    tip_seg: Vec<u32>,
    time_seg: Vec<u32>,
    rows: Vec<RawRow>,
    raw_time0: f64,
    time_column: Option<String>,
}

impl Dataset {
    /// Normalizes canonical samples: drops non-finite times, orders by time,
    /// shifts time so the first sample is zero and derives pen-state runs and
    /// time-gap runs.
    pub fn from_samples(samples: Vec<CanonicalSample>) -> SegResult<Self> {
        let input_len = samples.len();
        let mut samples: Vec<CanonicalSample> =
            samples.into_iter().filter(|s| s.time.is_finite()).collect();
        if samples.len() < input_len {
            warn!(
                dropped = input_len - samples.len(),
                "dropping samples with non-finite time"
            );
        }
        if samples.is_empty() {
            return Err(SegError::EmptyData);
        }
        samples.sort_by(|a, b| a.time.total_cmp(&b.time));

        let raw_time0 = samples[0].time;
        let n = samples.len();
        let mut out = Self {
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
            pressure: Vec::with_capacity(n),
            t: Vec::with_capacity(n),
            dt: Vec::new(),
            tip: Vec::with_capacity(n),
            tip_seg: Vec::new(),
            time_seg: Vec::new(),
            rows: Vec::with_capacity(n),
            raw_time0,
            time_column: None,
        };
        for sample in samples {
            out.x.push(sample.x);
            out.y.push(sample.y);
            out.z.push(sample.z);
            out.pressure.push(sample.pressure);
            out.t.push(sample.time - raw_time0);
            out.tip.push(sample.pressure > 0.0);
            out.rows.push(sample.row);
        }
        out.tip_seg = run_length_ids(&out.tip);

        out.dt = (0..n)
            .map(|i| if i + 1 < n { out.t[i + 1] - out.t[i] } else { 0.0 })
            .collect();
        let median_dt = median(&out.dt);
        let slips: Vec<bool> = out.dt.iter().map(|&d| d > 2.0 * median_dt).collect();
        out.time_seg = run_length_ids(&slips);

        debug!(
            samples = n,
            tip_runs = out.tip_seg.last().copied().unwrap_or(0),
            time_runs = out.time_seg.last().copied().unwrap_or(0),
            "dataset normalized"
        );
        Ok(out)
    }

    /// Builds a dataset from bare vectors, synthesizing `x`, `y`, `p`, `t`
    /// source rows. Handy for hosts that stream samples directly.
    pub fn from_vectors(x: &[f64], y: &[f64], t: &[f64], pressure: &[f64]) -> SegResult<Self> {
        let n = t.len();
        if x.len() != n || y.len() != n || pressure.len() != n {
            return Err(SegError::InvalidData(
                "sample vectors must have equal length".to_owned(),
            ));
        }
        let samples = (0..n)
            .map(|i| {
                let mut row = RawRow::new();
                row.insert("x".to_owned(), number(x[i]));
                row.insert("y".to_owned(), number(y[i]));
                row.insert("p".to_owned(), number(pressure[i]));
                row.insert("t".to_owned(), number(t[i]));
                CanonicalSample {
                    x: x[i],
                    y: y[i],
                    z: 0.0,
                    pressure: pressure[i],
                    time: t[i],
                    row,
                }
            })
            .collect();
        Ok(Self::from_samples(samples)?.with_time_column("t"))
    }

    #[must_use]
    pub fn with_time_column(mut self, name: impl Into<String>) -> Self {
        self.time_column = Some(name.into());
        self
    }

    /// Sub-dataset made of the given sample indices (ascending).
    ///
    /// Time, run ids and the raw time origin are carried over unchanged so
    /// selections made before a filter toggle stay aligned afterwards.
    pub fn retain_indices(&self, indices: &[usize]) -> SegResult<Self> {
        if indices.is_empty() {
            return Err(SegError::EmptyData);
        }
        if indices.iter().any(|&i| i >= self.len()) {
            return Err(SegError::InvalidData(
                "retained sample index out of bounds".to_owned(),
            ));
        }
        let pick_f = |v: &[f64]| indices.iter().map(|&i| v[i]).collect::<Vec<_>>();
        let pick_u = |v: &[u32]| indices.iter().map(|&i| v[i]).collect::<Vec<_>>();
        Ok(Self {
            x: pick_f(&self.x),
            y: pick_f(&self.y),
            z: pick_f(&self.z),
            pressure: pick_f(&self.pressure),
            t: pick_f(&self.t),
            dt: pick_f(&self.dt),
            tip: indices.iter().map(|&i| self.tip[i]).collect(),
            tip_seg: pick_u(&self.tip_seg),
            time_seg: pick_u(&self.time_seg),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            raw_time0: self.raw_time0,
            time_column: self.time_column.clone(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.t.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    #[must_use]
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    #[must_use]
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    #[must_use]
    pub fn z(&self) -> &[f64] {
        &self.z
    }

    #[must_use]
    pub fn pressure(&self) -> &[f64] {
        &self.pressure
    }

    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.t
    }

    #[must_use]
    pub fn dt(&self) -> &[f64] {
        &self.dt
    }

    /// Pen-down flags.
    #[must_use]
    pub fn tip(&self) -> &[bool] {
        &self.tip
    }

    #[must_use]
    pub fn tip_seg(&self) -> &[u32] {
        &self.tip_seg
    }

    #[must_use]
    pub fn time_seg(&self) -> &[u32] {
        &self.time_seg
    }

    #[must_use]
    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    /// Raw time of the earliest sample before normalization.
    #[must_use]
    pub fn raw_time0(&self) -> f64 {
        self.raw_time0
    }

    #[must_use]
    pub fn time_column(&self) -> Option<&str> {
        self.time_column.as_deref()
    }

    #[must_use]
    pub fn time_bounds(&self) -> Option<(f64, f64)> {
        Some((*self.t.first()?, *self.t.last()?))
    }

    /// Half-open sample range `[start, end)` with `t0 <= T[i] < t1` semantics
    /// of the painter: `start` is the first sample at or after `t0`, `end` the
    /// first sample at or after `t1`.
    #[must_use]
    pub fn index_range(&self, t0: f64, t1: f64) -> (usize, usize) {
        let start = self.t.partition_point(|&t| t < t0);
        let end = start + self.t[start..].partition_point(|&t| t < t1);
        (start, end)
    }

    /// Index of the sample nearest to `time` (earlier sample wins ties).
    #[must_use]
    pub fn nearest_index(&self, time: f64) -> Option<usize> {
        nearest_sample_index(&self.t, time)
    }
}

/// Binary-search nearest neighbour over a non-decreasing vector.
#[must_use]
pub fn nearest_sample_index(times: &[f64], time: f64) -> Option<usize> {
    if times.is_empty() || !time.is_finite() {
        return None;
    }
    let last = times.len() - 1;
    if time <= times[0] {
        return Some(0);
    }
    if time >= times[last] {
        return Some(last);
    }
    let hi = times.partition_point(|&t| t < time);
    let lo = hi - 1;
    if (times[lo] - time).abs() <= (times[hi] - time).abs() {
        Some(lo)
    } else {
        Some(hi)
    }
}

fn number(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}
