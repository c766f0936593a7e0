use std::sync::Arc;

use egui::Pos2;

use crate::chart::{AlignerLayout, CandleLayout, StreamLayout};
use crate::data::Dataset;

#[derive(Debug, Clone)]
pub enum AppEvent {
    Ui(UiEvent),
    DatasetLoaded { dataset: Arc<Dataset> },
    LoadFailed { message: String },
}

/// Pointer positions are in each chart's plot coordinates; `pointer` fields
/// are screen positions used to place tooltips.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Resized {
        candle: CandleLayout,
        stream: StreamLayout,
        aligner: AlignerLayout,
    },

    BrushChanged { selection_px: Option<(f32, f32)> },
    CandleHovered { index: usize, pointer: Pos2 },
    CandleLeft,

    StreamHovered { x_px: f32, pointer: Pos2 },
    StreamLeft,

    ShiftChanged { days: i32 },
}
