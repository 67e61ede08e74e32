//! Small descriptive statistics used by column detection, time
//! normalization and gap detection.
//!
//! All helpers accept empty input and return `NaN` (or `0.0` for the fitted
//! quantities) instead of panicking, mirroring how the detector treats
//! degenerate columns as "no signal".

use std::cmp::Ordering;

#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); `0.0` for fewer than two values.
#[must_use]
pub fn sd(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

#[must_use]
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let a = sorted(values);
    let m = a.len() / 2;
    if a.len() % 2 == 0 {
        (a[m - 1] + a[m]) / 2.0
    } else {
        a[m]
    }
}

/// Linear-interpolated quantile, `p` in `[0, 1]`.
#[must_use]
pub fn quantile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let a = sorted(values);
    let pos = (a.len() - 1) as f64 * p;
    let base = pos.floor() as usize;
    let rest = pos - base as f64;
    match a.get(base + 1) {
        Some(next) => a[base] + rest * (next - a[base]),
        None => a[base],
    }
}

#[must_use]
pub fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

#[must_use]
pub fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Consecutive differences `v[i+1] - v[i]`.
#[must_use]
pub fn diffs(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Least-squares slope of `y` against `x`; `0.0` when `x` is constant.
#[must_use]
pub fn lin_slope(x: &[f64], y: &[f64]) -> f64 {
    let mx = mean(x);
    let my = mean(y);
    let (mut num, mut den) = (0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mx;
        num += dx * (yi - my);
        den += dx * dx;
    }
    if den == 0.0 { 0.0 } else { num / den }
}

/// Coefficient of determination of a linear fit; `0.0` for constant input.
#[must_use]
pub fn lin_r2(x: &[f64], y: &[f64]) -> f64 {
    let mx = mean(x);
    let my = mean(y);
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mx;
        let dy = yi - my;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }
    let r = sxy / (sxx * syy).sqrt();
    r * r
}

/// 1-based run-length ids: the id increments whenever the value changes.
#[must_use]
pub fn run_length_ids<T: PartialEq>(values: &[T]) -> Vec<u32> {
    let mut out = Vec::with_capacity(values.len());
    let mut id = 1;
    for (i, value) in values.iter().enumerate() {
        if i > 0 && *value != values[i - 1] {
            id += 1;
        }
        out.push(id);
    }
    out
}
