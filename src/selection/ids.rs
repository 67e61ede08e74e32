use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::selection::{Selection, SelectionId};

/// Numbers selections `#1, #2, ...` by ascending `t1`.
///
/// Every selection takes a position, but only unlocked ones receive the
/// `#pos` label; locked labels are left untouched.
pub fn recompute_auto_ids(items: &mut IndexMap<SelectionId, Selection>) {
    let mut order: Vec<SelectionId> = items.keys().copied().collect();
    order.sort_by_key(|id| OrderedFloat(items[id].t1));

    for (pos, id) in order.iter().enumerate() {
        match items.get_mut(id) {
            Some(sel) if !sel.locked => sel.label = Some(format!("#{}", pos + 1)),
            _ => {}
        }
    }
}

/// Label shown for a selection, falling back to its position in `t0` order.
#[must_use]
pub fn display_label(selection: &Selection, position: usize) -> String {
    match &selection.label {
        Some(label) if !label.is_empty() => label.clone(),
        _ => format!("#{}", position + 1),
    }
}
