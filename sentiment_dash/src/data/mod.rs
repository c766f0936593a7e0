pub mod loader;
pub mod record;

pub use loader::{load_dataset, parse_comments, parse_market, spawn_load};
pub use record::*;
