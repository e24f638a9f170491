//! Text rendering utilities.

mod wrap;

pub use wrap::{truncate_to_width, visual_width, wrap_text};
