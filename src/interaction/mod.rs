//! Pointer state machines for the timeline and the XY scatter view.
//!
//! Controllers never own selections: every event receives the
//! [`SelectionSet`](crate::selection::SelectionSet) by `&mut` and keeps only
//! ids between events.

pub mod bubbles;
pub mod timeline;
pub mod timeline_geometry;
pub mod xy;

use serde::{Deserialize, Serialize};

use crate::core::{PixelRect, TimeRange};
use crate::selection::SelectionId;

pub use bubbles::BubbleFade;
pub use timeline::{TimelineController, TimelineFrame};
pub use timeline_geometry::{
    FixedAdvance, HandleSizes, HotspotCluster, LabelMeasure, TimelineLayout, TimelineTuning,
    bubble_radius,
};
pub use xy::{BrushMode, BrushTuning, XyBrushController, XyFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleSide {
    Left,
    Right,
}

/// Timeline gesture in progress. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionState {
    Idle,
    /// Dragging out a new selection from a pixel anchor on the track.
    CreatingSelection {
        anchor_px: f64,
        candidate: Option<TimeRange>,
    },
    DraggingHandle {
        id: SelectionId,
        side: HandleSide,
    },
    /// Dragging from inside `source` to fuse it with its neighbours.
    DraggingMerge {
        source: SelectionId,
        anchor_t: f64,
        current_t: f64,
    },
    Splitting {
        id: SelectionId,
        preview: Option<f64>,
    },
    /// Label text is owned by the host's editor until commit or cancel.
    EditingLabel {
        id: SelectionId,
    },
}

impl InteractionState {
    /// Selection the gesture refers to, if any.
    #[must_use]
    pub fn target(&self) -> Option<SelectionId> {
        match *self {
            Self::Idle | Self::CreatingSelection { .. } => None,
            Self::DraggingHandle { id, .. } | Self::Splitting { id, .. } | Self::EditingLabel { id } => Some(id),
            Self::DraggingMerge { source, .. } => Some(source),
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Pointer cursor the host should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorHint {
    #[default]
    Default,
    Grab,
    Grabbing,
    Crosshair,
    Move,
    Split,
    /// Resize cursors for the XY brush.
    ResizeHorizontal,
    ResizeVertical,
    ResizeDiagonal,
    ResizeAntiDiagonal,
}

/// Asks the host to open its text editor over `rect`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEditRequest {
    pub id: SelectionId,
    pub rect: PixelRect,
    pub initial_text: String,
}

/// What an input event changed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventOutcome {
    pub redraw_timeline: bool,
    pub redraw_xy: bool,
    /// Structure, spans or labels of the selection set changed.
    pub selections_changed: bool,
    pub cursor: CursorHint,
    pub label_edit: Option<LabelEditRequest>,
}

impl EventOutcome {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn timeline(cursor: CursorHint) -> Self {
        Self {
            redraw_timeline: true,
            cursor,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn both(cursor: CursorHint) -> Self {
        Self {
            redraw_timeline: true,
            redraw_xy: true,
            cursor,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn changed(cursor: CursorHint) -> Self {
        Self {
            selections_changed: true,
            ..Self::both(cursor)
        }
    }

    #[must_use]
    pub fn needs_redraw(&self) -> bool {
        self.redraw_timeline || self.redraw_xy
    }
}
