//! Chat pane module.
//!
//! The chat pane is the whole main area of the TUI:
//! - Transcript of the bound conversation (scrollable, bottom-anchored)
//! - Input area with the message composer

mod transcript;
mod widget;

pub use transcript::transcript_lines;
pub use widget::ChatPane;
