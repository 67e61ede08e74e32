use serde::{Deserialize, Serialize};

use crate::error::{SegError, SegResult};

/// Canvas size in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn ensure_valid(self) -> SegResult<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(SegError::InvalidViewport {
                width: self.width,
                height: self.height,
            })
        }
    }

    #[must_use]
    pub fn width_px(self) -> f64 {
        f64::from(self.width)
    }

    #[must_use]
    pub fn height_px(self) -> f64 {
        f64::from(self.height)
    }
}

/// Closed time interval `[t0, t1]` in normalized dataset time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub t0: f64,
    pub t1: f64,
}

impl TimeRange {
    /// Builds a range with ordered endpoints.
    #[must_use]
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            t0: a.min(b),
            t1: a.max(b),
        }
    }

    #[must_use]
    pub fn span(self) -> f64 {
        self.t1 - self.t0
    }

    /// `true` when both ends are finite and `t1 > t0`.
    #[must_use]
    pub fn is_proper(self) -> bool {
        self.t0.is_finite() && self.t1.is_finite() && self.t1 > self.t0
    }

    /// Open-interval overlap used by every merge decision.
    #[must_use]
    pub fn overlaps(self, t0: f64, t1: f64) -> bool {
        self.t0 < t1 && self.t1 > t0
    }

    #[must_use]
    pub fn contains_range(self, t0: f64, t1: f64) -> bool {
        t0 >= self.t0 && t1 <= self.t1
    }
}

/// Axis-aligned rectangle in canvas pixels; corners may be unordered while a
/// gesture is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PixelRect {
    #[must_use]
    pub fn from_point(x: f64, y: f64) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x,
            y1: y,
        }
    }

    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
        }
    }

    #[must_use]
    pub fn width(self) -> f64 {
        (self.x1 - self.x0).abs()
    }

    #[must_use]
    pub fn height(self) -> f64 {
        (self.y1 - self.y0).abs()
    }

    #[must_use]
    pub fn contains(self, x: f64, y: f64) -> bool {
        let r = self.normalized();
        x >= r.x0 && x <= r.x1 && y >= r.y0 && y <= r.y1
    }
}
