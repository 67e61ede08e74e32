//! Edge clamps applied while a selection edge is being dragged.
//!
//! Edges stop at the nearest neighbour edge they would cross and never pass
//! the opposite edge of the active selection: a minimal positive width is
//! always kept.

use crate::selection::{SelectionId, SelectionSet};

/// Smallest width a dragged selection keeps at `t`.
#[must_use]
pub fn min_width_at(t: f64) -> f64 {
    16.0 * f64::EPSILON * t.abs().max(1.0)
}

/// Clamps a dragged left edge of `active`.
///
/// Returns the current `t0` when `active` is unknown or `proposed_t0` is not
/// finite.
#[must_use]
pub fn clamp_left_handle(selections: &SelectionSet, active: SelectionId, proposed_t0: f64) -> f64 {
    let Some(sel) = selections.get(active) else {
        return proposed_t0;
    };
    if !proposed_t0.is_finite() {
        return sel.t0;
    }
    let t1 = sel.t1;
    let block_right = selections
        .iter()
        .filter(|(id, other)| *id != active && t1 > other.t0 && proposed_t0 < other.t1)
        .map(|(_, other)| other.t1)
        .fold(f64::NEG_INFINITY, f64::max);

    proposed_t0.max(block_right).min(t1 - min_width_at(t1))
}

/// Clamps a dragged right edge of `active`; mirror of [`clamp_left_handle`].
#[must_use]
pub fn clamp_right_handle(selections: &SelectionSet, active: SelectionId, proposed_t1: f64) -> f64 {
    let Some(sel) = selections.get(active) else {
        return proposed_t1;
    };
    if !proposed_t1.is_finite() {
        return sel.t1;
    }
    let t0 = sel.t0;
    let block_left = selections
        .iter()
        .filter(|(id, other)| *id != active && proposed_t1 > other.t0 && t0 < other.t1)
        .map(|(_, other)| other.t0)
        .fold(f64::INFINITY, f64::min);

    proposed_t1.min(block_left).max(t0 + min_width_at(t0))
}

/// Stops the growing edge of a new selection at the first selection edge
/// beyond `anchor` in the direction of growth.
#[must_use]
pub fn clamp_new_selection_time(selections: &SelectionSet, anchor: f64, current: f64) -> f64 {
    if current > anchor {
        let limit = selections
            .iter()
            .filter(|(_, sel)| sel.t0 > anchor && current > sel.t0)
            .map(|(_, sel)| sel.t0)
            .fold(f64::INFINITY, f64::min);
        current.min(limit)
    } else {
        let limit = selections
            .iter()
            .filter(|(_, sel)| sel.t1 < anchor && current < sel.t1)
            .map(|(_, sel)| sel.t1)
            .fold(f64::NEG_INFINITY, f64::max);
        current.max(limit)
    }
}
