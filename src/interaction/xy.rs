use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::{Dataset, PixelRect, TimeRange, Viewport, XyTransform, time_ranges_in_rect};
use crate::error::{SegError, SegResult};
use crate::interaction::{CursorHint, EventOutcome};
use crate::selection::SelectionSet;

/// Pixel tolerances of the XY brush.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushTuning {
    pub edge_tolerance_px: f64,
    pub corner_tolerance_px: f64,
    /// Rectangles narrower or shorter than this are discarded on release.
    pub min_size_px: f64,
    pub commit_radius_px: f64,
    /// Distance of the commit bubble from the rectangle's top-right corner.
    pub commit_offset_px: f64,
}

impl Default for BrushTuning {
    fn default() -> Self {
        Self {
            edge_tolerance_px: 6.0,
            corner_tolerance_px: 8.0,
            min_size_px: 5.0,
            commit_radius_px: 10.0,
            commit_offset_px: 16.0,
        }
    }
}

impl BrushTuning {
    pub fn validate(self) -> SegResult<Self> {
        let values = [
            self.edge_tolerance_px,
            self.corner_tolerance_px,
            self.min_size_px,
            self.commit_radius_px,
            self.commit_offset_px,
        ];
        if values.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(SegError::InvalidData(
                "brush tolerances must be finite and > 0".to_owned(),
            ));
        }
        Ok(self)
    }
}

/// Part of a pending rectangle grabbed for resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grip {
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Grip {
    fn cursor(self) -> CursorHint {
        match self {
            Self::Left | Self::Right => CursorHint::ResizeHorizontal,
            Self::Top | Self::Bottom => CursorHint::ResizeVertical,
            Self::TopLeft | Self::BottomRight => CursorHint::ResizeDiagonal,
            Self::TopRight | Self::BottomLeft => CursorHint::ResizeAntiDiagonal,
        }
    }

    fn apply(self, rect: &mut PixelRect, x: f64, y: f64) {
        match self {
            Self::Left => rect.x0 = x,
            Self::Right => rect.x1 = x,
            Self::Top => rect.y0 = y,
            Self::Bottom => rect.y1 = y,
            Self::TopLeft => (rect.x0, rect.y0) = (x, y),
            Self::TopRight => (rect.x1, rect.y0) = (x, y),
            Self::BottomLeft => (rect.x0, rect.y1) = (x, y),
            Self::BottomRight => (rect.x1, rect.y1) = (x, y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrushMode {
    Idle,
    /// Dragging out a fresh rectangle.
    Drawing,
    Resizing(Grip),
    /// Released and committable.
    Pending,
}

/// Inputs an XY event needs: the dataset and the currently visible samples.
#[derive(Debug, Clone, Copy)]
pub struct XyFrame<'a> {
    pub dataset: &'a Dataset,
    pub visible: &'a [usize],
    pub viewport: Viewport,
}

impl XyFrame<'_> {
    #[must_use]
    pub fn transform(&self) -> XyTransform {
        XyTransform::fit_dataset(self.dataset, self.visible, self.viewport)
    }
}

/// Rectangular brush over the XY scatter view.
#[derive(Debug, Clone, PartialEq)]
pub struct XyBrushController {
    tuning: BrushTuning,
    mode: BrushMode,
    rect: Option<PixelRect>,
    temp_ranges: Vec<TimeRange>,
}

impl Default for XyBrushController {
    fn default() -> Self {
        Self::new(BrushTuning::default())
    }
}

impl XyBrushController {
    #[must_use]
    pub fn new(tuning: BrushTuning) -> Self {
        Self {
            tuning,
            mode: BrushMode::Idle,
            rect: None,
            temp_ranges: Vec::new(),
        }
    }

    pub fn set_tuning(&mut self, tuning: BrushTuning) {
        self.tuning = tuning;
    }

    #[must_use]
    pub fn mode(&self) -> BrushMode {
        self.mode
    }

    #[must_use]
    pub fn rect(&self) -> Option<PixelRect> {
        self.rect
    }

    /// Time ranges covered by the rectangle, for timeline cross-highlighting.
    #[must_use]
    pub fn temp_ranges(&self) -> &[TimeRange] {
        &self.temp_ranges
    }

    /// Commit bubble `(cx, cy, radius)` once the rectangle is committable.
    #[must_use]
    pub fn commit_bubble(&self, viewport: Viewport) -> Option<(f64, f64, f64)> {
        if self.mode != BrushMode::Pending {
            return None;
        }
        let r = self.rect?.normalized();
        let radius = self.tuning.commit_radius_px;
        let cx = (r.x1 + self.tuning.commit_offset_px).min(viewport.width_px() - radius);
        let cy = (r.y0 - self.tuning.commit_offset_px).max(radius);
        Some((cx, cy, radius))
    }

    /// Clears the rectangle and its ranges.
    pub fn reset(&mut self) {
        self.mode = BrushMode::Idle;
        self.rect = None;
        self.temp_ranges.clear();
    }

    /// Ends an in-flight drag as if the pointer were released.
    pub fn cancel_gesture(&mut self) {
        match self.mode {
            BrushMode::Drawing => self.reset(),
            BrushMode::Resizing(_) => self.finish_drag(),
            BrushMode::Idle | BrushMode::Pending => {}
        }
    }

    fn grip_at(&self, x: f64, y: f64) -> Option<Grip> {
        let r = self.rect?.normalized();
        let corner = self.tuning.corner_tolerance_px;
        let corners = [
            (r.x0, r.y0, Grip::TopLeft),
            (r.x1, r.y0, Grip::TopRight),
            (r.x0, r.y1, Grip::BottomLeft),
            (r.x1, r.y1, Grip::BottomRight),
        ];
        if let Some((_, _, grip)) = corners
            .iter()
            .find(|(cx, cy, _)| (x - cx).abs() <= corner && (y - cy).abs() <= corner)
        {
            return Some(*grip);
        }

        let edge = self.tuning.edge_tolerance_px;
        let in_x = x >= r.x0 - edge && x <= r.x1 + edge;
        let in_y = y >= r.y0 - edge && y <= r.y1 + edge;
        if in_y && (x - r.x0).abs() <= edge {
            Some(Grip::Left)
        } else if in_y && (x - r.x1).abs() <= edge {
            Some(Grip::Right)
        } else if in_x && (y - r.y0).abs() <= edge {
            Some(Grip::Top)
        } else if in_x && (y - r.y1).abs() <= edge {
            Some(Grip::Bottom)
        } else {
            None
        }
    }

    fn refresh_ranges(&mut self, frame: &XyFrame<'_>) {
        self.temp_ranges = match self.rect {
            Some(rect) => time_ranges_in_rect(rect, frame.dataset, frame.visible, &frame.transform()),
            None => Vec::new(),
        };
    }

    pub fn pointer_down(
        &mut self,
        selections: &mut SelectionSet,
        frame: &XyFrame<'_>,
        x: f64,
        y: f64,
    ) -> EventOutcome {
        if frame.dataset.is_empty() {
            return EventOutcome::none();
        }
        if self.mode == BrushMode::Pending {
            if let Some((cx, cy, radius)) = self.commit_bubble(frame.viewport) {
                if (x - cx).hypot(y - cy) <= radius {
                    return self.commit(selections);
                }
            }
            if let Some(grip) = self.grip_at(x, y) {
                if let Some(rect) = self.rect.as_mut() {
                    *rect = rect.normalized();
                }
                self.mode = BrushMode::Resizing(grip);
                trace!(?grip, "brush resize started");
                return EventOutcome::both(grip.cursor());
            }
        }

        self.mode = BrushMode::Drawing;
        self.rect = Some(PixelRect::from_point(x, y));
        self.temp_ranges.clear();
        EventOutcome::both(CursorHint::Crosshair)
    }

    pub fn pointer_move(&mut self, frame: &XyFrame<'_>, x: f64, y: f64) -> EventOutcome {
        match self.mode {
            BrushMode::Drawing => {
                if let Some(rect) = self.rect.as_mut() {
                    rect.x1 = x;
                    rect.y1 = y;
                }
                self.refresh_ranges(frame);
                EventOutcome::both(CursorHint::Crosshair)
            }
            BrushMode::Resizing(grip) => {
                if let Some(rect) = self.rect.as_mut() {
                    grip.apply(rect, x, y);
                }
                self.refresh_ranges(frame);
                EventOutcome::both(grip.cursor())
            }
            BrushMode::Pending => {
                let cursor = self.grip_at(x, y).map_or(CursorHint::Default, Grip::cursor);
                EventOutcome {
                    cursor,
                    ..EventOutcome::none()
                }
            }
            BrushMode::Idle => EventOutcome::none(),
        }
    }

    pub fn pointer_up(&mut self) -> EventOutcome {
        match self.mode {
            BrushMode::Drawing | BrushMode::Resizing(_) => {
                self.finish_drag();
                EventOutcome::both(CursorHint::Default)
            }
            BrushMode::Idle | BrushMode::Pending => EventOutcome::none(),
        }
    }

    fn finish_drag(&mut self) {
        let Some(rect) = self.rect else {
            self.reset();
            return;
        };
        let min = self.tuning.min_size_px;
        if rect.width() < min || rect.height() < min {
            trace!(width = rect.width(), height = rect.height(), "brush discarded");
            self.reset();
            return;
        }
        self.rect = Some(rect.normalized());
        self.mode = BrushMode::Pending;
    }

    /// Adds the covered time ranges to `selections`, in order, then clears
    /// the brush.
    pub fn commit(&mut self, selections: &mut SelectionSet) -> EventOutcome {
        if self.mode != BrushMode::Pending {
            return EventOutcome::none();
        }
        let ranges = std::mem::take(&mut self.temp_ranges);
        self.reset();
        if ranges.is_empty() {
            return EventOutcome::both(CursorHint::Default);
        }
        selections.add_or_merge_ranges(&ranges);
        debug!(ranges = ranges.len(), "brush committed");
        EventOutcome::changed(CursorHint::Default)
    }
}
