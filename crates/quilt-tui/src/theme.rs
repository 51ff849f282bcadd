//! Color and style table for the TUI.

use ratatui::style::{Color, Modifier, Style};

/// Colors used across the pane widgets.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Border of inactive panes.
    pub border: Color,
    /// Border of the active pane.
    pub border_active: Color,
    /// Regular text.
    pub text: Color,
    /// De-emphasized text (placeholders, hints).
    pub muted: Color,
    /// Error notices.
    pub error: Color,
    /// User message labels.
    pub user: Color,
    /// Assistant message labels.
    pub assistant: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border: Color::DarkGray,
            border_active: Color::Cyan,
            text: Color::Reset,
            muted: Color::DarkGray,
            error: Color::Red,
            user: Color::Green,
            assistant: Color::Blue,
        }
    }
}

impl Theme {
    /// Style for de-emphasized text.
    pub fn dim(&self) -> Style {
        Style::default().fg(self.muted)
    }

    /// Style for error notices.
    pub fn alert(&self) -> Style {
        Style::default().fg(self.error).add_modifier(Modifier::BOLD)
    }
}
