pub mod dataset;
pub mod stats;
pub mod time_scale;
pub mod types;
pub mod visibility;
pub mod xy_transform;

pub use dataset::{CanonicalSample, Dataset, nearest_sample_index};
pub use time_scale::{TimeBarGeometry, TimeBarTuning, TimeTick, compute_time_ticks};
pub use types::{PixelRect, TimeRange, Viewport};
pub use visibility::{VisibilityPolicy, detect_time_gaps, merge_highlight_ranges};
pub use xy_transform::{XyTransform, time_ranges_in_rect};
