use serde::{Deserialize, Serialize};

use crate::core::Viewport;
use crate::error::{SegError, SegResult};

/// Proportional layout of the timeline track inside its canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeBarTuning {
    /// Left and right padding, as a fraction of canvas width.
    pub side_padding_ratio: f64,
    /// Track top edge, as a fraction of canvas height.
    pub track_top_ratio: f64,
    /// Track bottom edge, as a fraction of canvas height.
    pub track_bottom_ratio: f64,
}

impl Default for TimeBarTuning {
    fn default() -> Self {
        Self {
            side_padding_ratio: 0.05,
            track_top_ratio: 0.45,
            track_bottom_ratio: 0.75,
        }
    }
}

impl TimeBarTuning {
    pub fn validate(self) -> SegResult<Self> {
        if !self.side_padding_ratio.is_finite()
            || self.side_padding_ratio < 0.0
            || self.side_padding_ratio >= 0.5
        {
            return Err(SegError::InvalidData(
                "time bar side padding ratio must be finite and in [0, 0.5)".to_owned(),
            ));
        }
        let top = self.track_top_ratio;
        let bottom = self.track_bottom_ratio;
        if !top.is_finite() || !bottom.is_finite() || top <= 0.0 || bottom > 1.0 || top >= bottom {
            return Err(SegError::InvalidData(
                "time bar track ratios must satisfy 0 < top < bottom <= 1".to_owned(),
            ));
        }
        Ok(self)
    }
}

/// Pixel geometry of the timeline track for one canvas size and time span.
///
/// Derived on every hit-test or draw; never cached across resizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeBarGeometry {
    pub width: f64,
    pub height: f64,
    pub left_pad: f64,
    pub right_pad: f64,
    pub bar_width: f64,
    pub bar_y0: f64,
    pub bar_y1: f64,
    t_min: f64,
    t_max: f64,
}

impl TimeBarGeometry {
    #[must_use]
    pub fn new(viewport: Viewport, tuning: TimeBarTuning, t_min: f64, t_max: f64) -> Self {
        let width = viewport.width_px();
        let height = viewport.height_px();
        let left_pad = width * tuning.side_padding_ratio;
        let right_pad = width * tuning.side_padding_ratio;
        Self {
            width,
            height,
            left_pad,
            right_pad,
            bar_width: width - left_pad - right_pad,
            bar_y0: height * tuning.track_top_ratio,
            bar_y1: height * tuning.track_bottom_ratio,
            t_min,
            t_max,
        }
    }

    /// Geometry spanning `[times[0], times[last]]`; `None` with fewer than two samples.
    #[must_use]
    pub fn from_times(viewport: Viewport, tuning: TimeBarTuning, times: &[f64]) -> Option<Self> {
        if times.len() < 2 || !viewport.is_valid() {
            return None;
        }
        Some(Self::new(viewport, tuning, times[0], times[times.len() - 1]))
    }

    #[must_use]
    pub fn time_bounds(&self) -> (f64, f64) {
        (self.t_min, self.t_max)
    }

    #[must_use]
    pub fn time_to_pixel(&self, time: f64) -> f64 {
        let span = self.t_max - self.t_min;
        if span <= 0.0 {
            return self.left_pad;
        }
        self.left_pad + (time - self.t_min) / span * self.bar_width
    }

    /// Inverse of [`Self::time_to_pixel`], clamped to the track.
    #[must_use]
    pub fn pixel_to_time(&self, x: f64) -> f64 {
        if self.bar_width <= 0.0 {
            return self.t_min;
        }
        let rel = ((x - self.left_pad) / self.bar_width).clamp(0.0, 1.0);
        self.t_min + rel * (self.t_max - self.t_min)
    }

    #[must_use]
    pub fn clamp_pixel(&self, x: f64) -> f64 {
        x.clamp(self.left_pad, self.left_pad + self.bar_width)
    }

    #[must_use]
    pub fn track_contains_y(&self, y: f64) -> bool {
        y >= self.bar_y0 && y <= self.bar_y1
    }

    #[must_use]
    pub fn track_height(&self) -> f64 {
        self.bar_y1 - self.bar_y0
    }
}

/// One axis tick below the track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeTick {
    pub time: f64,
    pub label: String,
}

const TARGET_PX_PER_TICK: f64 = 90.0;

fn nice_step(raw: f64) -> f64 {
    let exp = raw.log10().floor();
    let fraction = raw / 10f64.powf(exp);
    let nice = if fraction < 1.5 {
        1.0
    } else if fraction < 3.0 {
        2.0
    } else if fraction < 7.0 {
        5.0
    } else {
        10.0
    };
    nice * 10f64.powf(exp)
}

fn decimals_for_step(step: f64) -> usize {
    if !step.is_finite() || step <= 0.0 {
        return 0;
    }
    let exp = step.log10().floor();
    if exp >= 0.0 { 0 } else { (-exp).min(6.0) as usize }
}

/// Adaptive ticks at 1/2/5 × 10^k steps, roughly one every 90 px.
#[must_use]
pub fn compute_time_ticks(t_min: f64, t_max: f64, bar_width_px: f64) -> Vec<TimeTick> {
    let span = t_max - t_min;
    if !span.is_finite() || span <= 0.0 || bar_width_px <= 0.0 {
        return Vec::new();
    }

    let max_ticks = (bar_width_px / TARGET_PX_PER_TICK).floor().max(2.0);
    let step = nice_step(span / max_ticks);
    let decimals = decimals_for_step(step);

    let first = (t_min / step).ceil();
    let mut ticks = Vec::new();
    let mut k = 0.0;
    loop {
        let time = (first + k) * step;
        if time > t_max + 1e-9 {
            break;
        }
        ticks.push(TimeTick {
            time,
            label: format!("{time:.decimals$}"),
        });
        k += 1.0;
    }
    ticks
}
