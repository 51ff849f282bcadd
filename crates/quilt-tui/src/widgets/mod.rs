//! Shared widgets for the pane UI.

mod input_bar;
mod pane_view;
mod text_input;

pub use input_bar::{display_rows, InputBar};
pub use pane_view::{PaneView, CLOSE_HIT_WIDTH};
pub use text_input::TextInputState;
