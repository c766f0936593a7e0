use std::sync::Arc;

use egui::Pos2;

use crate::chart::aligner::DEFAULT_SHIFT_RANGE_DAYS;
use crate::chart::{
    AlignerChart, AlignerLayout, CandleChart, CandleLayout, CandleTooltip, StreamChart,
    StreamLayout, StreamTooltip,
};
use crate::comments::CommentPanelView;
use crate::data::Dataset;

/// Tooltip content plus the pointer it follows.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchored<T> {
    pub content: T,
    pub pointer: Pos2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamHover {
    pub index: usize,
    pub guide_x: f32,
    pub tip: Anchored<StreamTooltip>,
}

#[derive(Debug, Clone)]
pub struct DashState {
    pub dataset: Arc<Dataset>,
    pub loading: bool,
    pub load_error: Option<String>,

    pub candle: CandleChart,
    pub stream: StreamChart,
    pub aligner: AlignerChart,

    pub panel: CommentPanelView,

    /// Highlighted candle; `None` once the pointer leaves its body.
    pub hovered_candle: Option<usize>,
    /// Last candle tooltip, kept after leave so it can fade out.
    pub candle_tip: Option<Anchored<CandleTooltip>>,
    pub stream_hover: Option<StreamHover>,

    pub shift_days: i32,
    pub shift_range_days: i32,
}

impl Default for DashState {
    fn default() -> Self {
        Self::with_dataset(Arc::new(Dataset::default()), Layouts::default())
    }
}

/// Plot sizes of the three charts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Layouts {
    pub candle: CandleLayout,
    pub stream: StreamLayout,
    pub aligner: AlignerLayout,
}

impl DashState {
    pub fn with_dataset(dataset: Arc<Dataset>, layouts: Layouts) -> Self {
        let records = &dataset.records;
        Self {
            candle: CandleChart::new(records, layouts.candle),
            stream: StreamChart::new(records, layouts.stream),
            aligner: AlignerChart::new(records, layouts.aligner),
            dataset,
            loading: true,
            load_error: None,
            panel: CommentPanelView::default(),
            hovered_candle: None,
            candle_tip: None,
            stream_hover: None,
            shift_days: 0,
            shift_range_days: DEFAULT_SHIFT_RANGE_DAYS,
        }
    }

    pub fn layouts(&self) -> Layouts {
        Layouts {
            candle: self.candle.layout(),
            stream: self.stream.layout(),
            aligner: self.aligner.layout(),
        }
    }

    /// Replace the dataset and rebuild every chart on the current layout.
    /// The shift slider keeps its value.
    pub fn install(&mut self, dataset: Arc<Dataset>) {
        let shift_days = self.shift_days;
        let shift_range_days = self.shift_range_days;
        *self = Self::with_dataset(dataset, self.layouts());
        self.shift_days = shift_days;
        self.shift_range_days = shift_range_days;
        self.loading = false;
    }

    pub fn candle_tip_visible(&self) -> bool {
        self.hovered_candle.is_some()
    }
}
