//! Non-overlapping time selections and the operations that keep them so.

pub mod clamp;
pub mod exchange;
pub mod ids;
pub mod model;

pub use clamp::{clamp_left_handle, clamp_new_selection_time, clamp_right_handle, min_width_at};
pub use exchange::{
    SEGMENT_ID_KEY, export_file_name, export_json, export_rows, import_selections,
    import_selections_from_json, resolve_time_key, snap_to_samples,
};
pub use ids::display_label;
pub use model::{Selection, SelectionId, SelectionSet};
