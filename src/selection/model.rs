use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::core::{TimeRange, nearest_sample_index};
use crate::selection::ids::recompute_auto_ids;

/// Stable handle to a selection.
///
/// Ids are never reused within a [`SelectionSet`], so a handle kept by a
/// controller across structural changes either resolves to the same
/// selection or to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectionId(u64);

impl SelectionId {
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SelectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sel-{}", self.0)
    }
}

/// A labelled time interval `[t0, t1]` with `t1 > t0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub t0: f64,
    pub t1: f64,
    /// Display identifier; `#k` when auto-numbered.
    pub label: Option<String>,
    /// Set when the user chose the label; auto-numbering then leaves it alone.
    pub locked: bool,
}

impl Selection {
    #[must_use]
    pub fn new(t0: f64, t1: f64) -> Self {
        Self {
            t0,
            t1,
            label: None,
            locked: false,
        }
    }

    #[must_use]
    pub fn with_locked_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self.locked = true;
        self
    }

    #[must_use]
    pub fn range(&self) -> TimeRange {
        TimeRange {
            t0: self.t0,
            t1: self.t1,
        }
    }

    #[must_use]
    pub fn contains_time(&self, time: f64) -> bool {
        time >= self.t0 && time <= self.t1
    }
}

type Matches = SmallVec<[SelectionId; 4]>;

/// Arena of non-overlapping selections.
///
/// Storage order is insertion order except after a split, which re-sorts by
/// `(t0, t1)`. No two stored selections overlap (open-interval test).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    items: IndexMap<SelectionId, Selection>,
    next_id: u64,
}

impl SelectionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: SelectionId) -> Option<&Selection> {
        self.items.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: SelectionId) -> bool {
        self.items.contains_key(&id)
    }

    /// Selections in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (SelectionId, &Selection)> + '_ {
        self.items.iter().map(|(id, sel)| (*id, sel))
    }

    pub fn ids(&self) -> impl Iterator<Item = SelectionId> + '_ {
        self.items.keys().copied()
    }

    /// Selections ordered by `t0`, then `t1`.
    #[must_use]
    pub fn sorted_by_t0(&self) -> Vec<(SelectionId, &Selection)> {
        let mut out: Vec<_> = self.iter().collect();
        out.sort_by(|(_, a), (_, b)| a.t0.total_cmp(&b.t0).then(a.t1.total_cmp(&b.t1)));
        out
    }

    /// First selection whose closed span contains `time`.
    #[must_use]
    pub fn find_at(&self, time: f64) -> Option<SelectionId> {
        self.iter()
            .find(|(_, sel)| sel.contains_time(time))
            .map(|(id, _)| id)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replaces every selection, keeping ids monotonic.
    ///
    /// Selections overlapping one already taken from `selections` are
    /// skipped, so the set never holds overlapping spans.
    pub fn replace_all(&mut self, selections: impl IntoIterator<Item = Selection>) {
        self.items.clear();
        for sel in selections {
            if !sel.range().is_proper() {
                warn!(t0 = sel.t0, t1 = sel.t1, "skipping improper selection");
                continue;
            }
            let clash = self
                .iter()
                .find(|(_, kept)| kept.range().overlaps(sel.t0, sel.t1))
                .map(|(id, _)| id);
            match clash {
                Some(id) => warn!(%id, t0 = sel.t0, t1 = sel.t1, "skipping overlapping selection"),
                None => {
                    self.insert(sel);
                }
            }
        }
        recompute_auto_ids(&mut self.items);
    }

    fn insert(&mut self, selection: Selection) -> SelectionId {
        let id = SelectionId(self.next_id);
        self.next_id += 1;
        self.items.insert(id, selection);
        id
    }

    pub fn recompute_auto_ids(&mut self) {
        recompute_auto_ids(&mut self.items);
    }

    /// Adds `[min(t0, t1), max(t0, t1)]`, merging it with every selection it
    /// overlaps or contains.
    ///
    /// Returns the selection now covering the range, or `None` when the
    /// range is empty or non-finite.
    pub fn add_or_merge_range(&mut self, t0: f64, t1: f64) -> Option<SelectionId> {
        let range = TimeRange::new(t0, t1);
        if !range.is_proper() {
            debug!(t0, t1, "ignoring empty or non-finite range");
            return None;
        }

        let host = self
            .iter()
            .find(|(_, sel)| sel.range().contains_range(range.t0, range.t1))
            .map(|(id, _)| id);
        if let Some(host) = host {
            self.recompute_auto_ids();
            return Some(host);
        }

        let mut overlapping: Matches = self
            .iter()
            .filter(|(_, sel)| {
                sel.range().overlaps(range.t0, range.t1)
                    || range.contains_range(sel.t0, sel.t1)
            })
            .map(|(id, _)| id)
            .collect();

        if overlapping.is_empty() {
            let id = self.insert(Selection::new(range.t0, range.t1));
            self.recompute_auto_ids();
            debug!(%id, t0 = range.t0, t1 = range.t1, "selection added");
            return Some(id);
        }

        overlapping.sort_by(|a, b| {
            let (sa, sb) = (&self.items[a], &self.items[b]);
            sa.t0.total_cmp(&sb.t0).then(sa.t1.total_cmp(&sb.t1))
        });
        let primary = overlapping[0];
        let union = self.absorb(primary, &overlapping[1..], range);
        self.recompute_auto_ids();
        debug!(
            %primary,
            absorbed = overlapping.len() - 1,
            t0 = union.t0,
            t1 = union.t1,
            "selection merged"
        );
        Some(primary)
    }

    /// Applies ranges one after another so later ranges can absorb earlier
    /// ones.
    pub fn add_or_merge_ranges(&mut self, ranges: &[TimeRange]) {
        for range in ranges {
            self.add_or_merge_range(range.t0, range.t1);
        }
    }

    /// Stretches `primary` over `extra` and every selection in `others`,
    /// then removes `others`.
    fn absorb(&mut self, primary: SelectionId, others: &[SelectionId], extra: TimeRange) -> TimeRange {
        let mut union = extra;
        for id in std::iter::once(&primary).chain(others) {
            if let Some(sel) = self.items.get(id) {
                union.t0 = union.t0.min(sel.t0);
                union.t1 = union.t1.max(sel.t1);
            }
        }
        for id in others {
            self.items.shift_remove(id);
        }
        if let Some(sel) = self.items.get_mut(&primary) {
            sel.t0 = union.t0;
            sel.t1 = union.t1;
        }
        union
    }

    /// Splits `id` at `t_split`; the left part keeps the id.
    ///
    /// With `times` (more than two samples) the split point snaps to the
    /// nearest sample inside the selection, and the split is refused when
    /// that sample is the first or last one the selection covers. Returns
    /// the id of the new right part.
    pub fn split(&mut self, id: SelectionId, t_split: f64, times: Option<&[f64]>) -> Option<SelectionId> {
        let Some(target) = self.items.get(&id) else {
            warn!(%id, "split on a stale selection id");
            return None;
        };
        let (t0, t1) = (target.t0, target.t1);
        if !(t_split > t0 && t_split < t1) {
            return None;
        }

        let t_split = match times.filter(|t| t.len() > 2) {
            Some(times) => snap_split(times, t0, t1, t_split)?,
            None => t_split,
        };

        let locked_label = target
            .label
            .clone()
            .filter(|label| target.locked && !label.is_empty());
        let mut right = Selection::new(t_split, t1);
        if let Some(sel) = self.items.get_mut(&id) {
            sel.t1 = t_split;
            if let Some(base) = &locked_label {
                sel.label = Some(format!("{base}_1"));
                right = right.with_locked_label(format!("{base}_2"));
            }
        }
        let right_id = self.insert(right);
        self.items
            .sort_by(|_, a, _, b| a.t0.total_cmp(&b.t0).then(a.t1.total_cmp(&b.t1)));
        self.recompute_auto_ids();
        debug!(%id, %right_id, t_split, "selection split");
        Some(right_id)
    }

    /// Removes a selection and renumbers the rest.
    pub fn delete(&mut self, id: SelectionId) -> Option<Selection> {
        let removed = self.items.shift_remove(&id);
        match &removed {
            Some(sel) => {
                self.recompute_auto_ids();
                debug!(%id, t0 = sel.t0, t1 = sel.t1, "selection deleted");
            }
            None => warn!(%id, "delete on a stale selection id"),
        }
        removed
    }

    /// Fuses every selection overlapping the envelope into one.
    ///
    /// Needs at least two overlapping selections. The merge source survives
    /// when it is among them, otherwise the first match in storage order.
    pub fn merge_by_envelope(&mut self, t0: f64, t1: f64, source: Option<SelectionId>) -> Option<SelectionId> {
        let envelope = TimeRange::new(t0, t1);
        if !(envelope.t0.is_finite() && envelope.t1.is_finite()) {
            return None;
        }
        let matches: Matches = self
            .iter()
            .filter(|(_, sel)| sel.range().overlaps(envelope.t0, envelope.t1))
            .map(|(id, _)| id)
            .collect();
        if matches.len() < 2 {
            return None;
        }

        let primary = source.filter(|s| matches.contains(s)).unwrap_or(matches[0]);
        let others: Matches = matches.iter().copied().filter(|&m| m != primary).collect();
        let first = self.items[&primary].range();
        let union = self.absorb(primary, &others, first);
        self.recompute_auto_ids();
        debug!(
            %primary,
            absorbed = others.len(),
            t0 = union.t0,
            t1 = union.t1,
            "selections merged by envelope"
        );
        Some(primary)
    }

    /// Parts of `[t0, t1]` not covered by any selection.
    #[must_use]
    pub fn uncovered_gaps(&self, t0: f64, t1: f64) -> Vec<TimeRange> {
        let envelope = TimeRange::new(t0, t1);
        let mut gaps = Vec::new();
        let mut cursor = envelope.t0;
        for (_, sel) in self.sorted_by_t0() {
            if sel.t1 <= cursor || sel.t0 >= envelope.t1 {
                continue;
            }
            if sel.t0 > cursor {
                gaps.push(TimeRange {
                    t0: cursor,
                    t1: sel.t0,
                });
            }
            cursor = cursor.max(sel.t1);
        }
        if envelope.t1 > cursor {
            gaps.push(TimeRange {
                t0: cursor,
                t1: envelope.t1,
            });
        }
        gaps
    }

    /// Writes a dragged left edge. The caller clamps first.
    pub fn set_t0(&mut self, id: SelectionId, t0: f64) -> bool {
        match self.items.get_mut(&id) {
            Some(sel) if t0.is_finite() && t0 < sel.t1 => {
                sel.t0 = t0;
                true
            }
            _ => false,
        }
    }

    /// Writes a dragged right edge. The caller clamps first.
    pub fn set_t1(&mut self, id: SelectionId, t1: f64) -> bool {
        match self.items.get_mut(&id) {
            Some(sel) if t1.is_finite() && t1 > sel.t0 => {
                sel.t1 = t1;
                true
            }
            _ => false,
        }
    }

    /// Commits an edited label: a non-empty text locks it, an empty text
    /// unlocks the selection and hands it back to auto-numbering.
    pub fn commit_label(&mut self, id: SelectionId, text: &str) -> bool {
        let text = text.trim();
        let Some(sel) = self.items.get_mut(&id) else {
            warn!(%id, "label commit on a stale selection id");
            return false;
        };
        sel.locked = !text.is_empty();
        if !text.is_empty() {
            sel.label = Some(text.to_owned());
        }
        self.recompute_auto_ids();
        debug!(%id, locked = !text.is_empty(), "label committed");
        true
    }
}

/// Snaps a split time to a sample strictly inside the selection's samples,
/// keeping at least one sample strictly inside each half.
fn snap_split(times: &[f64], t0: f64, t1: f64, t_split: f64) -> Option<f64> {
    let first = times.partition_point(|&t| t < t0);
    let end = times.partition_point(|&t| t <= t1);
    if end <= first + 2 {
        return None;
    }
    let last = end - 1;
    let k = first + nearest_sample_index(&times[first..end], t_split)?;
    if k <= first || k >= last {
        return None;
    }
    let snapped = times[k];
    let left_inner = times.partition_point(|&t| t <= t0);
    let right_inner = times.partition_point(|&t| t <= snapped);
    let has_left = times.get(left_inner).is_some_and(|&t| t < snapped);
    let has_right = times.get(right_inner).is_some_and(|&t| t < t1);
    (snapped > t0 && snapped < t1 && has_left && has_right).then_some(snapped)
}
