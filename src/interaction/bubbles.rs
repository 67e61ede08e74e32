use indexmap::IndexMap;

use crate::selection::{SelectionId, SelectionSet};

/// Below this distance from its target an alpha snaps onto it.
const SETTLE_EPSILON: f64 = 1e-3;

/// Fade state of the control bubbles above each selection.
///
/// Presentation state only: keyed by id and owned by the timeline
/// controller, never by the selection model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BubbleFade {
    alpha: IndexMap<SelectionId, f64>,
}

impl BubbleFade {
    #[must_use]
    pub fn alpha(&self, id: SelectionId) -> f64 {
        self.alpha.get(&id).copied().unwrap_or(0.0)
    }

    /// `true` once the bubble is opaque enough to be clicked.
    #[must_use]
    pub fn is_visible(&self, id: SelectionId, threshold: f64) -> bool {
        self.alpha(id) > threshold
    }

    /// Moves every alpha toward 1 for `target` and 0 for the rest by `rate`
    /// of the remaining distance. Returns `true` while anything is still
    /// changing.
    pub fn tick(&mut self, selections: &SelectionSet, target: Option<SelectionId>, rate: f64) -> bool {
        self.alpha.retain(|id, _| selections.contains(*id));
        let mut animating = false;
        for id in selections.ids() {
            let goal = if Some(id) == target { 1.0 } else { 0.0 };
            let current = self.alpha.entry(id).or_insert(0.0);
            let next = *current + (goal - *current) * rate;
            *current = if (goal - next).abs() < SETTLE_EPSILON { goal } else { next };
            animating |= *current != goal;
        }
        animating
    }

    /// Forces a bubble fully visible, e.g. while its label is being edited.
    pub fn show(&mut self, id: SelectionId) {
        self.alpha.insert(id, 1.0);
    }

    pub fn clear(&mut self) {
        self.alpha.clear();
    }
}
