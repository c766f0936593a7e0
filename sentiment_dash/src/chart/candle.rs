//! Candlestick focus chart plus the overview strip that brushes it.
//!
//! The overview ("context") scale always spans the full data range. The
//! focus scale's domain is whatever the brush selects, or the full range
//! when nothing is selected. Every domain change recomputes the vertical
//! max from the visible highs and the candle width from the visible count.

use egui::{Color32, Pos2, Rect};

use crate::data::{extent_ms, format_date_long, DailyRecord};
use crate::palette::{self, fear_color};
use crate::scale::{LinearScale, TimeScale};

pub const CANDLE_WIDTH_FRACTION: f32 = 0.6;
pub const MIN_CANDLE_WIDTH: f32 = 2.0;
pub const MIN_BODY_HEIGHT: f32 = 2.0;
pub const Y_HEADROOM: f64 = 1.1;
/// Vertical max used when the brushed window holds no usable high.
pub const EMPTY_WINDOW_MAX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleLayout {
    pub width: f32,
    pub focus_height: f32,
    pub context_height: f32,
}

impl Default for CandleLayout {
    fn default() -> Self {
        Self {
            width: 800.0,
            focus_height: 320.0,
            context_height: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandleGlyph {
    pub index: usize,
    pub x: f32,
    pub wick_top: f32,
    pub wick_bottom: f32,
    pub body: Rect,
    pub fill: Color32,
}

#[derive(Debug, Clone)]
pub struct CandleChart {
    layout: CandleLayout,
    full: (f64, f64),
    context: TimeScale,
    focus: TimeScale,
    y: LinearScale,
    context_y: LinearScale,
    /// Brushed time range; `None` means cleared.
    selection: Option<(f64, f64)>,
    visible: Vec<usize>,
    candle_width: f32,
}

fn max_high<'a>(records: impl Iterator<Item = &'a DailyRecord>) -> Option<f64> {
    records
        .map(|r| r.high)
        .filter(|h| !h.is_nan())
        .fold(None, |acc: Option<f64>, h| Some(acc.map_or(h, |m| m.max(h))))
}

impl CandleChart {
    pub fn new(records: &[DailyRecord], layout: CandleLayout) -> Self {
        let full = extent_ms(records).unwrap_or((0.0, 0.0));
        let global_max = max_high(records.iter()).unwrap_or(0.0);
        let mut chart = Self {
            layout,
            full,
            context: TimeScale::new(full, (0.0, layout.width)),
            focus: TimeScale::new(full, (0.0, layout.width)),
            y: LinearScale::new((0.0, global_max), (layout.focus_height, 0.0)),
            context_y: LinearScale::new((0.0, global_max), (layout.context_height, 0.0)),
            selection: Some(full),
            visible: Vec::new(),
            candle_width: MIN_CANDLE_WIDTH,
        };
        chart.apply_domain(records, full);
        chart
    }

    pub fn layout(&self) -> CandleLayout {
        self.layout
    }

    /// Resize; the focus domain and selection are kept.
    pub fn set_layout(&mut self, records: &[DailyRecord], layout: CandleLayout) {
        if layout == self.layout {
            return;
        }
        self.layout = layout;
        self.context.set_range((0.0, layout.width));
        self.focus.set_range((0.0, layout.width));
        self.y.set_range((layout.focus_height, 0.0));
        self.context_y.set_range((layout.context_height, 0.0));
        let domain = self.focus.domain();
        self.apply_domain(records, domain);
    }

    /// Brush moved or cleared. `selection_px` is in overview-strip pixels.
    pub fn brush(&mut self, records: &[DailyRecord], selection_px: Option<(f32, f32)>) {
        let selection = selection_px
            .and_then(normalize_selection)
            .map(|(a, b)| (self.context.invert(a), self.context.invert(b)));
        self.selection = selection;
        self.apply_domain(records, selection.unwrap_or(self.full));
    }

    fn apply_domain(&mut self, records: &[DailyRecord], domain: (f64, f64)) {
        self.focus.set_domain(domain);
        let (d0, d1) = domain;
        self.visible = records
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                let t = r.ms();
                t >= d0 && t <= d1
            })
            .map(|(i, _)| i)
            .collect();

        let top = max_high(self.visible.iter().map(|&i| &records[i]))
            .filter(|m| *m != 0.0)
            .unwrap_or(EMPTY_WINDOW_MAX);
        self.y.set_domain((0.0, top * Y_HEADROOM));

        self.candle_width = if self.visible.is_empty() {
            MIN_CANDLE_WIDTH
        } else {
            (self.layout.width / self.visible.len() as f32 * CANDLE_WIDTH_FRACTION)
                .max(MIN_CANDLE_WIDTH)
        };
    }

    pub fn full_domain(&self) -> (f64, f64) {
        self.full
    }

    pub fn focus_domain(&self) -> (f64, f64) {
        self.focus.domain()
    }

    pub fn focus_scale(&self) -> &TimeScale {
        &self.focus
    }

    pub fn context_scale(&self) -> &TimeScale {
        &self.context
    }

    pub fn y_scale(&self) -> &LinearScale {
        &self.y
    }

    pub fn visible(&self) -> &[usize] {
        &self.visible
    }

    pub fn candle_width(&self) -> f32 {
        self.candle_width
    }

    /// Brush rectangle in overview-strip pixels.
    pub fn selection_px(&self) -> Option<(f32, f32)> {
        self.selection
            .map(|(a, b)| (self.context.apply(a), self.context.apply(b)))
    }

    /// Glyph geometry for every record, in focus-plot pixels. Candles
    /// outside the focus domain land outside `[0, width]` and get clipped.
    pub fn glyphs(&self, records: &[DailyRecord]) -> Vec<CandleGlyph> {
        let w = self.candle_width;
        records
            .iter()
            .enumerate()
            .map(|(index, r)| {
                let x = self.focus.apply(r.ms());
                let y_open = self.y.apply(r.open);
                let y_close = self.y.apply(r.close);
                let top = self.y.apply(r.open.max(r.close));
                let height = (y_open - y_close).abs().max(MIN_BODY_HEIGHT);
                CandleGlyph {
                    index,
                    x,
                    wick_top: self.y.apply(r.high),
                    wick_bottom: self.y.apply(r.low),
                    body: Rect::from_min_size(Pos2::new(x - w / 2.0, top), egui::vec2(w, height)),
                    fill: fear_color(r.fear_ratio),
                }
            })
            .collect()
    }

    /// Index of the candle body under `pos` (focus-plot pixels).
    pub fn hit_test(&self, records: &[DailyRecord], pos: Pos2) -> Option<usize> {
        let plot = Rect::from_min_size(
            Pos2::ZERO,
            egui::vec2(self.layout.width, self.layout.focus_height),
        );
        if !plot.contains(pos) {
            return None;
        }
        self.glyphs(records)
            .into_iter()
            .rev()
            .find(|g| g.body.contains(pos))
            .map(|g| g.index)
    }

    /// Close-price polyline for the overview strip.
    pub fn context_line(&self, records: &[DailyRecord]) -> Vec<Pos2> {
        records
            .iter()
            .map(|r| Pos2::new(self.context.apply(r.ms()), self.context_y.apply(r.close)))
            .collect()
    }
}

/// Pointer gesture on the overview strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrushGesture {
    /// Pressed outside the selection: sweep a new one from `anchor`.
    Create { anchor: f32 },
    /// Pressed inside the selection: drag it without resizing.
    Move { grab: f32, start: (f32, f32) },
}

/// Ordered selection, or `None` when it has no width.
pub fn normalize_selection((a, b): (f32, f32)) -> Option<(f32, f32)> {
    let (lo, hi) = (a.min(b), a.max(b));
    (hi - lo > f32::EPSILON).then_some((lo, hi))
}

impl BrushGesture {
    pub fn begin(press_x: f32, current: Option<(f32, f32)>) -> Self {
        match current {
            Some((a, b)) if press_x >= a.min(b) && press_x <= a.max(b) => BrushGesture::Move {
                grab: press_x,
                start: (a.min(b), a.max(b)),
            },
            _ => BrushGesture::Create { anchor: press_x },
        }
    }

    pub fn update(&self, pointer_x: f32, width: f32) -> Option<(f32, f32)> {
        let width = width.max(0.0);
        match *self {
            BrushGesture::Create { anchor } => {
                normalize_selection((anchor.clamp(0.0, width), pointer_x.clamp(0.0, width)))
            }
            BrushGesture::Move { grab, start } => {
                let (s0, s1) = start;
                let shift = (pointer_x - grab).clamp(-s0, width - s1);
                Some((s0 + shift, s1 + shift))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    pub fn color(&self) -> Color32 {
        match self {
            Trend::Up => palette::TREND_UP,
            Trend::Down => palette::TREND_DOWN,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandleTooltip {
    pub date: String,
    pub trend: Trend,
    pub trend_text: String,
    pub total_posts: u32,
    pub fear_pct: String,
}

pub fn candle_tooltip(r: &DailyRecord) -> CandleTooltip {
    let change = r.price_change();
    let trend = if change >= 0.0 { Trend::Up } else { Trend::Down };
    let trend_text = match trend {
        Trend::Up => format!("▲ Up (${change:.2})"),
        Trend::Down => format!("▼ Down (${:.2})", change.abs()),
    };
    CandleTooltip {
        date: format_date_long(r.date),
        trend,
        trend_text,
        total_posts: r.total_posts(),
        fear_pct: format!("{:.1}%", r.fear_ratio * 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(day: u32, open: f64, close: f64, high: f64, low: f64) -> DailyRecord {
        DailyRecord {
            date: NaiveDate::from_ymd_opt(2021, 1, day).unwrap(),
            open,
            high,
            low,
            close,
            volatility: 0.1,
            fear_ratio: 0.6,
            hype: 1,
            fear: 2,
            anger: 3,
            noise: 4,
        }
    }

    fn three_days() -> Vec<DailyRecord> {
        vec![
            rec(1, 40.0, 45.0, 50.0, 38.0),
            rec(2, 45.0, 18.0, 20.0, 15.0),
            rec(3, 18.0, 25.0, 30.0, 17.0),
        ]
    }

    fn layout(width: f32) -> CandleLayout {
        CandleLayout {
            width,
            focus_height: 200.0,
            context_height: 30.0,
        }
    }

    #[test]
    fn starts_on_full_range_with_headroom() {
        let recs = three_days();
        let chart = CandleChart::new(&recs, layout(200.0));
        assert_eq!(chart.focus_domain(), chart.full_domain());
        assert_eq!(chart.visible(), &[0, 1, 2]);
        assert_eq!(chart.y_scale().domain(), (0.0, 50.0 * Y_HEADROOM));
        assert_eq!(chart.selection_px(), Some((0.0, 200.0)));
    }

    #[test]
    fn brushing_rescales_to_visible_highs() {
        let recs = three_days();
        let mut chart = CandleChart::new(&recs, layout(200.0));
        // 2 day span over 200px: day 2 sits at 100px, day 3 at 200px
        chart.brush(&recs, Some((100.0, 200.0)));
        assert_eq!(chart.visible(), &[1, 2]);
        assert_eq!(chart.y_scale().domain(), (0.0, 30.0 * Y_HEADROOM));
        assert!((chart.candle_width() - 200.0 / 2.0 * CANDLE_WIDTH_FRACTION).abs() < 1e-4);
    }

    #[test]
    fn clearing_restores_full_domain_exactly() {
        let recs = three_days();
        let mut chart = CandleChart::new(&recs, layout(200.0));
        chart.brush(&recs, Some((13.0, 77.0)));
        assert_ne!(chart.focus_domain(), chart.full_domain());
        chart.brush(&recs, None);
        assert_eq!(chart.focus_domain(), chart.full_domain());
        assert_eq!(chart.selection_px(), None);

        chart.brush(&recs, Some((50.0, 50.0)));
        assert_eq!(chart.focus_domain(), chart.full_domain());
    }

    #[test]
    fn empty_window_falls_back() {
        let recs = three_days();
        let mut chart = CandleChart::new(&recs, layout(200.0));
        chart.brush(&recs, Some((10.0, 40.0)));
        assert!(chart.visible().is_empty());
        assert_eq!(chart.y_scale().domain(), (0.0, EMPTY_WINDOW_MAX * Y_HEADROOM));
        assert_eq!(chart.candle_width(), MIN_CANDLE_WIDTH);
    }

    #[test]
    fn candle_width_has_a_floor() {
        let recs: Vec<DailyRecord> = (1..=31).map(|d| rec(d, 1.0, 2.0, 3.0, 0.5)).collect();
        let chart = CandleChart::new(&recs, layout(60.0));
        assert_eq!(chart.candle_width(), MIN_CANDLE_WIDTH);
    }

    #[test]
    fn doji_body_keeps_minimum_height() {
        let recs = vec![rec(1, 10.0, 10.0, 12.0, 9.0), rec(2, 10.0, 10.0, 11.0, 9.5)];
        let chart = CandleChart::new(&recs, layout(100.0));
        for g in chart.glyphs(&recs) {
            assert!(g.body.height() >= MIN_BODY_HEIGHT);
        }
        let g = &chart.glyphs(&recs)[0];
        assert_eq!(g.body.min.y, chart.y_scale().apply(10.0));
        assert!(g.wick_top < g.wick_bottom);
    }

    #[test]
    fn hit_test_finds_body() {
        let recs = three_days();
        let chart = CandleChart::new(&recs, layout(200.0));
        let g = chart.glyphs(&recs)[1].clone();
        assert_eq!(chart.hit_test(&recs, g.body.center()), Some(1));
        assert_eq!(chart.hit_test(&recs, Pos2::new(-5.0, g.body.center().y)), None);
    }

    #[test]
    fn resize_keeps_brushed_domain() {
        let recs = three_days();
        let mut chart = CandleChart::new(&recs, layout(200.0));
        chart.brush(&recs, Some((100.0, 200.0)));
        let domain = chart.focus_domain();
        chart.set_layout(&recs, layout(400.0));
        assert_eq!(chart.focus_domain(), domain);
        assert_eq!(chart.selection_px(), Some((200.0, 400.0)));
    }

    #[test]
    fn gestures_create_and_move_within_bounds() {
        let g = BrushGesture::begin(150.0, Some((10.0, 50.0)));
        assert_eq!(g, BrushGesture::Create { anchor: 150.0 });
        assert_eq!(g.update(90.0, 200.0), Some((90.0, 150.0)));
        assert_eq!(g.update(260.0, 200.0), Some((150.0, 200.0)));

        let g = BrushGesture::begin(30.0, Some((10.0, 50.0)));
        assert_eq!(g.update(40.0, 200.0), Some((20.0, 60.0)));
        assert_eq!(g.update(-100.0, 200.0), Some((0.0, 40.0)));
        assert_eq!(g.update(900.0, 200.0), Some((160.0, 200.0)));
    }

    #[test]
    fn zero_width_drag_is_no_selection() {
        let g = BrushGesture::begin(75.0, None);
        assert_eq!(g.update(75.0, 200.0), None);
        // both ends clamp onto the right edge
        let g = BrushGesture::begin(250.0, None);
        assert_eq!(g.update(300.0, 200.0), None);
        assert_eq!(normalize_selection((40.0, 10.0)), Some((10.0, 40.0)));
    }

    #[test]
    fn tooltip_trend_and_totals() {
        let up = candle_tooltip(&rec(4, 10.0, 12.5, 13.0, 9.0));
        assert_eq!(up.trend, Trend::Up);
        assert_eq!(up.trend_text, "▲ Up ($2.50)");
        assert_eq!(up.total_posts, 10);
        assert_eq!(up.fear_pct, "60.0%");
        assert_eq!(up.date, "Jan 04, 2021");

        let down = candle_tooltip(&rec(5, 12.0, 11.0, 13.0, 9.0));
        assert_eq!(down.trend, Trend::Down);
        assert_eq!(down.trend_text, "▼ Down ($1.00)");

        let flat = candle_tooltip(&rec(6, 12.0, 12.0, 13.0, 9.0));
        assert_eq!(flat.trend, Trend::Up);
    }
}
