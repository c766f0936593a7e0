//! Fear count against volatility on twin vertical axes, with a day shift
//! applied to the fear line only.

use egui::Pos2;

use crate::curve::{monotone_x, SEGMENT_STEPS};
use crate::data::{extent_ms, DailyRecord, DAY_MS};
use crate::scale::{LinearScale, TimeScale};

pub const DEFAULT_SHIFT_RANGE_DAYS: i32 = 10;
pub const VOL_OPACITY: f32 = 0.5;
pub const FEAR_LINE_WIDTH: f32 = 3.0;

/// Width in pixels of the one-day interval starting at the domain minimum.
pub fn pixel_per_day(x: &TimeScale) -> f32 {
    let d0 = x.domain().0.min(x.domain().1);
    x.apply(d0 + DAY_MS) - x.apply(d0)
}

pub fn shift_px(days: i32, pixel_per_day: f32) -> f32 {
    days as f32 * pixel_per_day
}

pub fn shift_label(days: i32) -> String {
    if days > 0 {
        format!("+{days} Days")
    } else {
        format!("{days} Days")
    }
}

fn finite_max(values: impl Iterator<Item = f64>) -> f64 {
    values.filter(|v| v.is_finite()).fold(0.0, f64::max)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignerLayout {
    pub width: f32,
    pub height: f32,
}

impl Default for AlignerLayout {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 260.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlignerChart {
    layout: AlignerLayout,
    x: TimeScale,
    left: LinearScale,
    right: LinearScale,
    pixel_per_day: f32,
}

impl AlignerChart {
    pub fn new(records: &[DailyRecord], layout: AlignerLayout) -> Self {
        let domain = extent_ms(records).unwrap_or((0.0, 0.0));
        let x = TimeScale::new(domain, (0.0, layout.width));
        let fear_max = finite_max(records.iter().map(|r| r.fear as f64));
        let vol_max = finite_max(records.iter().map(|r| r.volatility));
        Self {
            layout,
            pixel_per_day: pixel_per_day(&x),
            x,
            left: LinearScale::new((0.0, fear_max), (layout.height, 0.0)),
            right: LinearScale::new((0.0, vol_max), (layout.height, 0.0)),
        }
    }

    pub fn set_layout(&mut self, layout: AlignerLayout) {
        self.layout = layout;
        self.x.set_range((0.0, layout.width));
        self.left.set_range((layout.height, 0.0));
        self.right.set_range((layout.height, 0.0));
        self.pixel_per_day = pixel_per_day(&self.x);
    }

    pub fn layout(&self) -> AlignerLayout {
        self.layout
    }

    pub fn x_scale(&self) -> &TimeScale {
        &self.x
    }

    pub fn left_scale(&self) -> &LinearScale {
        &self.left
    }

    pub fn right_scale(&self) -> &LinearScale {
        &self.right
    }

    pub fn pixel_per_day(&self) -> f32 {
        self.pixel_per_day
    }

    pub fn shift_px(&self, days: i32) -> f32 {
        shift_px(days, self.pixel_per_day)
    }

    /// Upper edge of the volatility area; the lower edge is the plot floor.
    pub fn volatility_edge(&self, records: &[DailyRecord]) -> Vec<Pos2> {
        let pts: Vec<Pos2> = records
            .iter()
            .filter(|r| r.volatility.is_finite())
            .map(|r| Pos2::new(self.x.apply(r.ms()), self.right.apply(r.volatility)))
            .collect();
        monotone_x(&pts, SEGMENT_STEPS)
    }

    /// Unshifted fear-count line.
    pub fn fear_line(&self, records: &[DailyRecord]) -> Vec<Pos2> {
        let pts: Vec<Pos2> = records
            .iter()
            .map(|r| Pos2::new(self.x.apply(r.ms()), self.left.apply(r.fear as f64)))
            .collect();
        monotone_x(&pts, SEGMENT_STEPS)
    }
}
