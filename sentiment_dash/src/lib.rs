pub mod app;
pub mod chart;
pub mod comments;
pub mod config;
pub mod curve;
pub mod data;
pub mod error;
pub mod metrics;
pub mod palette;
pub mod prep;
pub mod scale;

pub use error::{DashError, Result};
