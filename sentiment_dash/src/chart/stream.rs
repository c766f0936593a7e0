//! Stacked sentiment volumes with a hover guide.

use std::cmp::Ordering;

use egui::{Color32, Pos2};

use crate::curve::{basis, SEGMENT_STEPS};
use crate::data::{extent_ms, format_date_long, DailyRecord};
use crate::palette::Sentiment;
use crate::scale::{LinearScale, TimeScale};

/// Stacked layers, bottom to top. Noise is not drawn.
pub const STREAM_KEYS: [Sentiment; 3] = [Sentiment::Hype, Sentiment::Fear, Sentiment::Anger];
pub const LAYER_OPACITY: f32 = 0.9;
pub const Y_AXIS_TITLE: &str = "Total Reddit Posts";

fn count(r: &DailyRecord, key: Sentiment) -> u32 {
    match key {
        Sentiment::Hype => r.hype,
        Sentiment::Fear => r.fear,
        Sentiment::Anger => r.anger,
        Sentiment::Noise => r.noise,
    }
}

/// Per-record `(y0, y1)` bounds of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct StackLayer {
    pub key: Sentiment,
    pub bands: Vec<(f64, f64)>,
}

/// Cumulative stack with a zero baseline.
pub fn stack(records: &[DailyRecord]) -> Vec<StackLayer> {
    let mut base = vec![0.0f64; records.len()];
    STREAM_KEYS
        .iter()
        .map(|&key| {
            let bands = records
                .iter()
                .zip(base.iter_mut())
                .map(|(r, y0)| {
                    let lo = *y0;
                    let hi = lo + count(r, key) as f64;
                    *y0 = hi;
                    (lo, hi)
                })
                .collect();
            StackLayer { key, bands }
        })
        .collect()
}

fn stack_top(layers: &[StackLayer]) -> f64 {
    layers
        .last()
        .map(|l| l.bands.iter().map(|b| b.1).fold(0.0, f64::max))
        .unwrap_or(0.0)
}

/// Record closest to `t_ms`, searching the pair around its lower-bound
/// insertion point (starting at index 1). Equal distances pick the later
/// record. `None` when there is no pair to compare.
pub fn nearest_index(records: &[DailyRecord], t_ms: f64) -> Option<usize> {
    if records.len() < 2 || t_ms.is_nan() {
        return None;
    }
    let i = 1 + records[1..].partition_point(|r| r.ms() < t_ms);
    if i >= records.len() {
        return None;
    }
    let before = t_ms - records[i - 1].ms();
    let after = records[i].ms() - t_ms;
    match before.partial_cmp(&after) {
        Some(Ordering::Less) => Some(i - 1),
        _ => Some(i),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamTooltip {
    pub date: String,
    pub hype: u32,
    pub fear: u32,
    pub anger: u32,
    pub total: u32,
}

pub fn stream_tooltip(r: &DailyRecord) -> StreamTooltip {
    StreamTooltip {
        date: format_date_long(r.date),
        hype: r.hype,
        fear: r.fear,
        anger: r.anger,
        total: r.stream_total(),
    }
}

/// Filled layer outline as two sample runs sharing x positions.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPath {
    pub key: Sentiment,
    pub fill: Color32,
    pub top: Vec<Pos2>,
    pub bottom: Vec<Pos2>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamLayout {
    pub width: f32,
    pub height: f32,
}

impl Default for StreamLayout {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 260.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamChart {
    layout: StreamLayout,
    x: TimeScale,
    y: LinearScale,
    layers: Vec<StackLayer>,
}

impl StreamChart {
    pub fn new(records: &[DailyRecord], layout: StreamLayout) -> Self {
        let layers = stack(records);
        let domain = extent_ms(records).unwrap_or((0.0, 0.0));
        Self {
            layout,
            x: TimeScale::new(domain, (0.0, layout.width)),
            y: LinearScale::new((0.0, stack_top(&layers)), (layout.height, 0.0)),
            layers,
        }
    }

    pub fn set_layout(&mut self, layout: StreamLayout) {
        self.layout = layout;
        self.x.set_range((0.0, layout.width));
        self.y.set_range((layout.height, 0.0));
    }

    pub fn layout(&self) -> StreamLayout {
        self.layout
    }

    pub fn x_scale(&self) -> &TimeScale {
        &self.x
    }

    pub fn y_scale(&self) -> &LinearScale {
        &self.y
    }

    pub fn layers(&self) -> &[StackLayer] {
        &self.layers
    }

    pub fn paths(&self, records: &[DailyRecord]) -> Vec<LayerPath> {
        let xs: Vec<f32> = records.iter().map(|r| self.x.apply(r.ms())).collect();
        self.layers
            .iter()
            .map(|layer| {
                let run = |pick: fn(&(f64, f64)) -> f64| -> Vec<Pos2> {
                    let pts: Vec<Pos2> = xs
                        .iter()
                        .zip(&layer.bands)
                        .map(|(&x, b)| Pos2::new(x, self.y.apply(pick(b))))
                        .collect();
                    basis(&pts, SEGMENT_STEPS)
                };
                LayerPath {
                    key: layer.key,
                    fill: layer.key.color().gamma_multiply(LAYER_OPACITY),
                    top: run(|b: &(f64, f64)| b.1),
                    bottom: run(|b: &(f64, f64)| b.0),
                }
            })
            .collect()
    }

    /// Pointer x (plot pixels) to the hovered record and its guide x.
    pub fn hover(&self, records: &[DailyRecord], px: f32) -> Option<(usize, f32)> {
        let idx = nearest_index(records, self.x.invert(px))?;
        Some((idx, self.x.apply(records[idx].ms())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DAY_MS;
    use chrono::NaiveDate;

    fn rec(day: u32, hype: u32, fear: u32, anger: u32) -> DailyRecord {
        DailyRecord {
            date: NaiveDate::from_ymd_opt(2021, 2, day).unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volatility: 0.2,
            fear_ratio: 0.5,
            hype,
            fear,
            anger,
            noise: 99,
        }
    }

    fn fixture() -> Vec<DailyRecord> {
        vec![rec(1, 10, 5, 1), rec(2, 3, 3, 3), rec(4, 20, 0, 7)]
    }

    #[test]
    fn stacks_cumulatively_without_noise() {
        let layers = stack(&fixture());
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].bands[0], (0.0, 10.0));
        assert_eq!(layers[1].bands[0], (10.0, 15.0));
        assert_eq!(layers[2].bands[0], (15.0, 16.0));
        assert_eq!(layers[2].bands[2], (20.0, 27.0));
        assert_eq!(stack_top(&layers), 27.0);

        let chart = StreamChart::new(&fixture(), StreamLayout::default());
        assert_eq!(chart.y_scale().domain(), (0.0, 27.0));
    }

    #[test]
    fn nearest_picks_closer_neighbour() {
        let recs = fixture();
        let d1 = recs[1].ms();
        assert_eq!(nearest_index(&recs, d1 + 0.2 * DAY_MS), Some(1));
        assert_eq!(nearest_index(&recs, d1 + 1.6 * DAY_MS), Some(2));
        assert_eq!(nearest_index(&recs, recs[0].ms() + 0.4 * DAY_MS), Some(0));
        assert_eq!(nearest_index(&recs, recs[0].ms() - DAY_MS), Some(0));
    }

    #[test]
    fn nearest_ties_go_later() {
        let recs = fixture();
        assert_eq!(nearest_index(&recs, recs[0].ms() + 0.5 * DAY_MS), Some(1));
        assert_eq!(nearest_index(&recs, recs[1].ms() + DAY_MS), Some(2));
    }

    #[test]
    fn nearest_exits_without_a_pair() {
        let recs = fixture();
        assert_eq!(nearest_index(&[], 0.0), None);
        assert_eq!(nearest_index(&recs[..1], recs[0].ms()), None);
        assert_eq!(nearest_index(&recs, recs[2].ms() + 1.0), None);
        assert_eq!(nearest_index(&recs, recs[2].ms()), Some(2));
    }

    #[test]
    fn hover_snaps_guide_to_record() {
        let recs = fixture();
        let chart = StreamChart::new(&recs, StreamLayout { width: 300.0, height: 100.0 });
        // three day span, 100px per day: day 2 at 100px
        let (idx, x) = chart.hover(&recs, 130.0).unwrap();
        assert_eq!(idx, 1);
        assert!((x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn tooltip_sums_stacked_layers() {
        let t = stream_tooltip(&rec(1, 10, 5, 1));
        assert_eq!((t.hype, t.fear, t.anger, t.total), (10, 5, 1, 16));
        assert_eq!(t.date, "Feb 01, 2021");
    }

    #[test]
    fn layer_runs_share_sample_positions() {
        let recs = fixture();
        let chart = StreamChart::new(&recs, StreamLayout::default());
        for path in chart.paths(&recs) {
            assert_eq!(path.top.len(), path.bottom.len());
            for (a, b) in path.top.iter().zip(&path.bottom) {
                assert!((a.x - b.x).abs() < 1e-3);
                assert!(a.y <= b.y + 1e-3);
            }
        }
    }
}
