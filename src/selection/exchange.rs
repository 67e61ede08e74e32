//! Segmented export and its re-import.
//!
//! An export is a JSON array of source rows that fall inside a selection,
//! each tagged with the owning selection's label under [`SEGMENT_ID_KEY`].
//! Times in an export are raw file times; import re-aligns them with the
//! dataset's time origin and snaps them onto its samples.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::{Dataset, nearest_sample_index};
use crate::data::{RawRow, coerce_f64};
use crate::error::{SegError, SegResult};
use crate::selection::ids::display_label;
use crate::selection::{Selection, SelectionSet};

pub const SEGMENT_ID_KEY: &str = "ManSegID";

const IMPORT_TIME_KEYS: [&str; 6] = ["t", "T", "time", "Time", "Time_MS", "device_time"];

/// Source rows covered by a selection, tagged with its label.
///
/// A sample on a boundary shared by two selections goes to the earlier one
/// in `t0` order.
#[must_use]
pub fn export_rows(dataset: &Dataset, selections: &SelectionSet) -> Vec<RawRow> {
    let ordered = selections.sorted_by_t0();
    if ordered.is_empty() {
        return Vec::new();
    }
    let labels: Vec<String> = ordered
        .iter()
        .enumerate()
        .map(|(pos, (_, sel))| display_label(sel, pos))
        .collect();

    let mut out = Vec::new();
    for (&t, row) in dataset.times().iter().zip(dataset.rows()) {
        if let Some(pos) = ordered.iter().position(|(_, sel)| sel.contains_time(t)) {
            let mut tagged = row.clone();
            tagged.insert(SEGMENT_ID_KEY.to_owned(), Value::String(labels[pos].clone()));
            out.push(tagged);
        }
    }
    debug!(rows = out.len(), selections = ordered.len(), "export rows built");
    out
}

pub fn export_json(dataset: &Dataset, selections: &SelectionSet) -> SegResult<String> {
    Ok(serde_json::to_string_pretty(&export_rows(dataset, selections))?)
}

/// File name of the export for `source`: `<stem>_segmented.json`.
#[must_use]
pub fn export_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("data");
    format!("{stem}_segmented.json")
}

/// Time key of an export: the dataset's own time column when present,
/// otherwise the first common time name found in the first row.
#[must_use]
pub fn resolve_time_key(rows: &[RawRow], preferred: Option<&str>) -> Option<String> {
    let first = rows.first()?;
    if let Some(key) = preferred.filter(|k| first.contains_key(*k)) {
        return Some(key.to_owned());
    }
    IMPORT_TIME_KEYS
        .iter()
        .find(|k| first.contains_key(**k))
        .map(|k| (*k).to_owned())
}

/// Nearest sample time, clamped to the sample range. Non-finite input or an
/// empty vector returns `time` unchanged.
#[must_use]
pub fn snap_to_samples(times: &[f64], time: f64) -> f64 {
    nearest_sample_index(times, time).map_or(time, |i| times[i])
}

/// Rebuilds locked selections from exported rows, ordered by `t0`.
///
/// Consecutive labelled rows sharing a label form one segment, so a label
/// reused on disjoint selections comes back as separate selections. Groups
/// whose raw span or snapped span collapses are dropped, as are segments
/// overlapping an earlier one.
pub fn import_selections(rows: &[RawRow], dataset: &Dataset) -> SegResult<Vec<Selection>> {
    if rows.is_empty() || dataset.is_empty() {
        return Ok(Vec::new());
    }
    let time_key = resolve_time_key(rows, dataset.time_column())
        .ok_or_else(|| SegError::InvalidData("segmented export has no time column".to_owned()))?;

    let mut runs: Vec<(String, f64, f64)> = Vec::new();
    for row in rows {
        let Some(label) = row.get(SEGMENT_ID_KEY).and_then(segment_label) else {
            continue;
        };
        let t = row.get(&time_key).map_or(f64::NAN, coerce_f64) - dataset.raw_time0();
        if !t.is_finite() {
            continue;
        }
        match runs.last_mut() {
            Some((current, t0, t1)) if *current == label => {
                *t0 = t0.min(t);
                *t1 = t1.max(t);
            }
            _ => runs.push((label, t, t)),
        }
    }

    let times = dataset.times();
    let mut out: Vec<Selection> = Vec::with_capacity(runs.len());
    for (label, t0, t1) in runs {
        if !(t1 > t0) {
            warn!(%label, t0, t1, "dropping segment with collapsed raw span");
            continue;
        }
        let (s0, s1) = (snap_to_samples(times, t0), snap_to_samples(times, t1));
        if !(s1 > s0) {
            warn!(%label, s0, s1, "dropping segment with collapsed snapped span");
            continue;
        }
        out.push(Selection::new(s0, s1).with_locked_label(label));
    }
    out.sort_by(|a, b| a.t0.total_cmp(&b.t0));

    let mut kept: Vec<Selection> = Vec::with_capacity(out.len());
    for sel in out {
        if let Some(prev) = kept.last().filter(|prev| prev.range().overlaps(sel.t0, sel.t1)) {
            warn!(
                label = sel.label.as_deref().unwrap_or_default(),
                over = prev.label.as_deref().unwrap_or_default(),
                "dropping segment overlapping an earlier one"
            );
            continue;
        }
        kept.push(sel);
    }
    debug!(selections = kept.len(), %time_key, "segmented export imported");
    Ok(kept)
}

/// Parses an export and rebuilds its selections. Non-object entries are
/// skipped.
pub fn import_selections_from_json(text: &str, dataset: &Dataset) -> SegResult<Vec<Selection>> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(SegError::InvalidData(
            "segmented export must be a JSON array".to_owned(),
        ));
    };
    let rows: Vec<RawRow> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map.into_iter().collect()),
            _ => None,
        })
        .collect();
    import_selections(&rows, dataset)
}

fn segment_label(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_owned(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}
