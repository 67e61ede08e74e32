use serde::{Deserialize, Serialize};

use crate::core::{Dataset, PixelRect, TimeRange, Viewport};

/// Fraction of the visible data extent added on every side.
pub const XY_MARGIN_RATIO: f64 = 0.1;

/// Uniform-scale, letterboxed, Y-flipped mapping between data XY and canvas
/// pixels.
///
/// Derived from the visible sample set and canvas size; recompute it whenever
/// either changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XyTransform {
    pub min_x: f64,
    pub min_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
    pub canvas_height: f64,
}

impl XyTransform {
    /// Fits the bounding box of `visible` samples into `viewport`.
    ///
    /// With no visible samples the identity-like transform (scale 1, no
    /// offset) is returned. A zero-extent axis borrows the scale of the
    /// other axis; a single point is centered at scale 1.
    #[must_use]
    pub fn fit(x: &[f64], y: &[f64], visible: &[usize], viewport: Viewport) -> Self {
        let width = viewport.width_px();
        let height = viewport.height_px();
        let points = visible
            .iter()
            .filter_map(|&i| Some((*x.get(i)?, *y.get(i)?)))
            .filter(|(px, py)| px.is_finite() && py.is_finite());

        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        for (px, py) in points {
            bounds = Some(match bounds {
                None => (px, px, py, py),
                Some((x0, x1, y0, y1)) => (x0.min(px), x1.max(px), y0.min(py), y1.max(py)),
            });
        }
        let Some((mut min_x, mut max_x, mut min_y, mut max_y)) = bounds else {
            return Self {
                min_x: 0.0,
                min_y: 0.0,
                offset_x: 0.0,
                offset_y: 0.0,
                scale: 1.0,
                canvas_height: height,
            };
        };

        let margin_x = (max_x - min_x) * XY_MARGIN_RATIO;
        let margin_y = (max_y - min_y) * XY_MARGIN_RATIO;
        min_x -= margin_x;
        max_x += margin_x;
        min_y -= margin_y;
        max_y += margin_y;

        let w = max_x - min_x;
        let h = max_y - min_y;
        let scale = match (w > 0.0, h > 0.0) {
            (true, true) => (width / w).min(height / h),
            (true, false) => width / w,
            (false, true) => height / h,
            (false, false) => 1.0,
        };

        Self {
            min_x,
            min_y,
            offset_x: (width - w * scale) / 2.0,
            offset_y: (height - h * scale) / 2.0,
            scale,
            canvas_height: height,
        }
    }

    #[must_use]
    pub fn fit_dataset(dataset: &Dataset, visible: &[usize], viewport: Viewport) -> Self {
        Self::fit(dataset.x(), dataset.y(), visible, viewport)
    }

    #[must_use]
    pub fn to_canvas_x(&self, x: f64) -> f64 {
        self.offset_x + (x - self.min_x) * self.scale
    }

    #[must_use]
    pub fn to_canvas_y(&self, y: f64) -> f64 {
        self.canvas_height - (self.offset_y + (y - self.min_y) * self.scale)
    }

    #[must_use]
    pub fn to_data_x(&self, px: f64) -> f64 {
        self.min_x + (px - self.offset_x) / self.scale
    }

    #[must_use]
    pub fn to_data_y(&self, py: f64) -> f64 {
        self.min_y + (self.canvas_height - py - self.offset_y) / self.scale
    }

    /// Data-space bounds `(x_min, x_max, y_min, y_max)` covered by a pixel rectangle.
    #[must_use]
    pub fn data_bounds(&self, rect: PixelRect) -> (f64, f64, f64, f64) {
        let r = rect.normalized();
        // Canvas y grows downward: the top pixel edge is the data maximum.
        (
            self.to_data_x(r.x0),
            self.to_data_x(r.x1),
            self.to_data_y(r.y1),
            self.to_data_y(r.y0),
        )
    }
}

/// Converts a pixel rectangle on the XY canvas into the time ranges covered by
/// the visible samples inside it.
///
/// Visible samples inside the data-space bounds are walked in index order and
/// grouped into runs of consecutive indices; each run yields
/// `{T[run_start], T[run_end]}`.
#[must_use]
pub fn time_ranges_in_rect(
    rect: PixelRect,
    dataset: &Dataset,
    visible: &[usize],
    transform: &XyTransform,
) -> Vec<TimeRange> {
    let (x_min, x_max, y_min, y_max) = transform.data_bounds(rect);
    let (xs, ys, ts) = (dataset.x(), dataset.y(), dataset.times());

    let mut out = Vec::new();
    let mut run: Option<(usize, usize)> = None;
    for &i in visible {
        if i >= dataset.len() {
            continue;
        }
        let inside = xs[i] >= x_min && xs[i] <= x_max && ys[i] >= y_min && ys[i] <= y_max;
        if !inside {
            continue;
        }
        run = match run {
            Some((start, prev)) if i == prev + 1 => Some((start, i)),
            Some((start, prev)) => {
                out.push(TimeRange {
                    t0: ts[start],
                    t1: ts[prev],
                });
                Some((i, i))
            }
            None => Some((i, i)),
        };
    }
    if let Some((start, prev)) = run {
        out.push(TimeRange {
            t0: ts[start],
            t1: ts[prev],
        });
    }
    out
}
