pub mod aligner;
pub mod candle;
pub mod stream;

pub use aligner::{AlignerChart, AlignerLayout};
pub use candle::{BrushGesture, CandleChart, CandleLayout, CandleTooltip};
pub use stream::{StreamChart, StreamLayout, StreamTooltip};
