//! Hit-test geometry for the timeline: handle regions, the hotspot cluster
//! (split, delete, label) above each selection, and the label box.
//!
//! Everything here is a pure function of the canvas size and the selection
//! being tested; nothing is cached between calls.

use serde::{Deserialize, Serialize};

use crate::core::{PixelRect, TimeBarGeometry, TimeBarTuning};
use crate::error::{SegError, SegResult};
use crate::interaction::HandleSide;
use crate::selection::Selection;

/// Measures rendered label text in pixels.
///
/// Hosts with a real font stack plug their measurer in; tests and headless
/// callers use [`FixedAdvance`].
pub trait LabelMeasure {
    fn text_width(&self, text: &str) -> f64;
}

/// Monospace-ish estimate: a constant advance per character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAdvance {
    pub px_per_char: f64,
}

impl Default for FixedAdvance {
    fn default() -> Self {
        Self { px_per_char: 7.0 }
    }
}

impl LabelMeasure for FixedAdvance {
    fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.px_per_char
    }
}

/// Timeline layout and animation tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineTuning {
    pub bar: TimeBarTuning,
    /// Horizontal padding on each side of the label text.
    pub label_padding_px: f64,
    /// Gap between hotspot circles.
    pub cluster_gap_px: f64,
    /// Bubble alpha above which hotspots become clickable.
    pub visible_alpha: f64,
    /// Fraction of the remaining distance a bubble fade covers per tick.
    pub fade_rate: f64,
}

impl Default for TimelineTuning {
    fn default() -> Self {
        Self {
            bar: TimeBarTuning::default(),
            label_padding_px: 6.0,
            cluster_gap_px: 6.0,
            visible_alpha: 0.01,
            fade_rate: 0.2,
        }
    }
}

impl TimelineTuning {
    pub fn validate(self) -> SegResult<Self> {
        self.bar.validate()?;
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.label_padding_px) || !positive(self.cluster_gap_px) {
            return Err(SegError::InvalidData(
                "timeline paddings must be finite and > 0".to_owned(),
            ));
        }
        if !(self.visible_alpha > 0.0 && self.visible_alpha < 1.0) {
            return Err(SegError::InvalidData(
                "visible bubble alpha must be in (0, 1)".to_owned(),
            ));
        }
        if !(self.fade_rate > 0.0 && self.fade_rate <= 1.0) {
            return Err(SegError::InvalidData(
                "bubble fade rate must be in (0, 1]".to_owned(),
            ));
        }
        Ok(self)
    }
}

/// Handle triangle dimensions, scaled by canvas height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleSizes {
    pub side: f64,
    pub margin: f64,
    pub tri_offset: f64,
    /// Half the triangle's height.
    pub half_height: f64,
}

impl HandleSizes {
    #[must_use]
    pub fn for_height(height: f64) -> Self {
        let side = (0.05 * height).max(10.0);
        Self {
            side,
            margin: (0.01 * height).max(1.0),
            tri_offset: 0.06 * height,
            half_height: 3.0_f64.sqrt() * side / 4.0,
        }
    }
}

/// Hotspot bubble radius for a canvas height.
#[must_use]
pub fn bubble_radius(height: f64) -> f64 {
    (0.07 * height).clamp(10.0, 15.0)
}

/// Centers of the split, delete and label bubbles above one selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotspotCluster {
    pub split: (f64, f64),
    pub delete: (f64, f64),
    pub label: (f64, f64),
    pub radius: f64,
}

impl HotspotCluster {
    #[must_use]
    pub fn hits_split(&self, x: f64, y: f64) -> bool {
        within(self.split, self.radius, x, y)
    }

    #[must_use]
    pub fn hits_delete(&self, x: f64, y: f64) -> bool {
        within(self.delete, self.radius, x, y)
    }
}

fn within(center: (f64, f64), radius: f64, x: f64, y: f64) -> bool {
    (x - center.0).hypot(y - center.1) <= radius
}

/// Timeline geometry for one frame: the track plus the control layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineLayout {
    pub bar: TimeBarGeometry,
    pub handles: HandleSizes,
    pub radius: f64,
    label_padding: f64,
    cluster_gap: f64,
}

impl TimelineLayout {
    #[must_use]
    pub fn new(bar: TimeBarGeometry, tuning: &TimelineTuning) -> Self {
        Self {
            bar,
            handles: HandleSizes::for_height(bar.height),
            radius: bubble_radius(bar.height),
            label_padding: tuning.label_padding_px,
            cluster_gap: tuning.cluster_gap_px,
        }
    }

    /// Pixel edges of a selection on the track.
    #[must_use]
    pub fn selection_pixels(&self, selection: &Selection) -> (f64, f64) {
        (
            self.bar.time_to_pixel(selection.t0),
            self.bar.time_to_pixel(selection.t1),
        )
    }

    /// Grab region of a handle whose line sits at `x_line`.
    ///
    /// The region reaches further inward than outward and extends from above
    /// the triangle down to the bottom of the track.
    #[must_use]
    pub fn handle_rect(&self, x_line: f64, side: HandleSide) -> PixelRect {
        let h = &self.handles;
        let width = h.side + h.margin;
        let extra = width / 2.0;
        let tri_y = self.bar.bar_y0 - h.tri_offset;
        let (x0, x1) = match side {
            HandleSide::Left => (x_line - extra, x_line + width),
            HandleSide::Right => (x_line - width, x_line + extra),
        };
        PixelRect {
            x0,
            y0: tri_y - 3.0 * h.half_height,
            x1,
            y1: self.bar.bar_y1,
        }
    }

    #[must_use]
    pub fn hits_handle(&self, x: f64, y: f64, x_line: f64, side: HandleSide) -> bool {
        self.handle_rect(x_line, side).contains(x, y)
    }

    /// Bubble cluster centered above the selection midpoint.
    #[must_use]
    pub fn cluster(&self, selection: &Selection) -> HotspotCluster {
        let (x0, x1) = self.selection_pixels(selection);
        let r = self.radius;
        let tri_y = self.bar.bar_y0 - 2.0 * self.handles.tri_offset;
        let anchor_y = tri_y - self.handles.half_height - r;
        let virtual_width = 3.0 * 2.0 * r + 2.0 * self.cluster_gap;
        let left_edge = (x0 + x1) / 2.0 - virtual_width / 2.0;
        let center = |k: f64| (left_edge + r + k * (2.0 * r + self.cluster_gap), anchor_y);
        HotspotCluster {
            split: center(0.0),
            delete: center(1.0),
            label: center(2.0),
            radius: r,
        }
    }

    /// Label box at the third cluster slot; text-width driven.
    #[must_use]
    pub fn label_rect(&self, selection: &Selection, text: &str, measure: &dyn LabelMeasure) -> PixelRect {
        let cluster = self.cluster(selection);
        let r = self.radius;
        let (cx, cy) = cluster.label;
        let width = measure.text_width(text) + 2.0 * self.label_padding;
        let x0 = (cx - r).max(cx - width / 2.0);
        PixelRect {
            x0,
            y0: cy - r,
            x1: x0 + width,
            y1: cy + r,
        }
    }

    /// Area where a press starts a new selection: the track, widened by a
    /// third of the side padding on each end.
    #[must_use]
    pub fn new_selection_zone_contains(&self, x: f64, y: f64) -> bool {
        let left = self.bar.left_pad - self.bar.left_pad / 3.0;
        let right = self.bar.left_pad + self.bar.bar_width + self.bar.right_pad / 3.0;
        x >= left && x <= right && self.bar.track_contains_y(y)
    }

    /// Hover over the selection body: anywhere from the top of the canvas
    /// down to the track bottom, between the selection edges.
    #[must_use]
    pub fn hovers_body(&self, selection: &Selection, raw_x: f64, y: f64) -> bool {
        let (x0, x1) = self.selection_pixels(selection);
        y >= 1.0 && y <= self.bar.bar_y1 && raw_x >= x0 && raw_x <= x1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Viewport;

    #[test]
    fn cluster_is_centered_on_selection_midpoint() {
        let bar = TimeBarGeometry::new(Viewport::new(1000, 200), TimeBarTuning::default(), 0.0, 10.0);
        let layout = TimelineLayout::new(bar, &TimelineTuning::default());
        let cluster = layout.cluster(&Selection::new(2.0, 6.0));
        let mid = (layout.bar.time_to_pixel(2.0) + layout.bar.time_to_pixel(6.0)) / 2.0;
        assert!((cluster.delete.0 - mid).abs() < 1e-9);
        assert!(cluster.split.0 < cluster.delete.0 && cluster.delete.0 < cluster.label.0);
    }

    #[test]
    fn bubble_radius_is_bounded() {
        assert_eq!(bubble_radius(50.0), 10.0);
        assert_eq!(bubble_radius(1000.0), 15.0);
    }
}
