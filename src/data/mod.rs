pub mod column_detection;
pub mod filters;
pub mod normalize;
pub mod parse;
pub mod table;

pub use column_detection::{CanonicalColumns, DetectedColumns, DiffStats, TIME_NAMES, detect_columns};
pub use filters::{FilterSettings, remove_edge_lifts, remove_last_stroke};
pub use normalize::{LoadOptions, LoadedData, build_dataset};
pub use parse::{Delimiter, parse_delimited, parse_text};
pub use table::{NumericTable, RawRow, RawTable, coerce_f64};
