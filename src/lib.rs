//! penseg: headless segmentation core for pen trajectory recordings.
//!
//! A recording (x, y, pressure and time per sample) is loaded from delimited
//! text or JSON, normalized onto a zero-based time axis and segmented into
//! non-overlapping time selections. Selections are edited through two pointer
//! controllers (a timeline track and a rectangular XY brush) and exported as
//! the original rows tagged with a `ManSegID` column.
//!
//! Rendering and windowing belong to the host; this crate exposes geometry,
//! hit-testing and state only.

pub mod api;
pub mod core;
pub mod data;
pub mod error;
pub mod interaction;
pub mod selection;
pub mod telemetry;

pub use api::{AnnotationSession, HostFs, SessionConfig, StdHost};
pub use core::{Dataset, TimeRange, Viewport};
pub use data::{FilterSettings, LoadOptions};
pub use error::{SegError, SegResult};
pub use interaction::{EventOutcome, TimelineController, XyBrushController};
pub use selection::{Selection, SelectionId, SelectionSet};
