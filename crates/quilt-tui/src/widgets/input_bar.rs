//! Draft input surface for one pane.
//!
//! Renders the multi-line draft with a block cursor, hard-wrapping long
//! lines at the available width. In clamped mode the content scrolls
//! internally and the caret is kept visible.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::Line,
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::theme::Theme;
use crate::widgets::TextInputState;

/// Display rows the draft needs at `width` text columns, counting
/// hard-wrapped long lines. This is the natural-height measurement the
/// sizing computation consumes.
pub fn display_rows(content: &str, width: u16) -> usize {
    let width = width as usize;
    content
        .split('\n')
        .map(|line| {
            let chars = line.chars().count();
            if width == 0 {
                1
            } else {
                chars.div_ceil(width).max(1)
            }
        })
        .sum()
}

/// Draft input widget.
pub struct InputBar<'a> {
    input: &'a TextInputState,
    theme: &'a Theme,
    focused: bool,
    scroll: bool,
    placeholder: &'a str,
}

impl<'a> InputBar<'a> {
    /// Create a new input bar widget.
    pub fn new(input: &'a TextInputState, theme: &'a Theme) -> Self {
        Self {
            input,
            theme,
            focused: false,
            scroll: false,
            placeholder: "",
        }
    }

    /// Set whether the input holds focus.
    #[must_use]
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Set clamped mode: content scrolls internally.
    #[must_use]
    pub fn scroll(mut self, scroll: bool) -> Self {
        self.scroll = scroll;
        self
    }

    /// Set placeholder text shown while empty.
    #[must_use]
    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Build display rows and the row index holding the cursor.
    fn build_rows(&self, text_width: usize) -> (Vec<String>, usize) {
        let content = self.input.content();
        let cursor = self.input.cursor();

        let mut rows = Vec::new();
        let mut cursor_row = 0;
        let mut chars_before_line = 0;

        for line in content.split('\n') {
            let chars: Vec<char> = line.chars().collect();
            let line_start_row = rows.len();

            if text_width == 0 {
                rows.push(String::new());
            } else if chars.is_empty() {
                rows.push(String::new());
            } else {
                for chunk in chars.chunks(text_width) {
                    rows.push(chunk.iter().collect());
                }
            }

            // Locate the cursor within this line
            let line_len = chars.len();
            let cursor_in_line = cursor >= chars_before_line && cursor <= chars_before_line + line_len;
            if cursor_in_line {
                let col = cursor - chars_before_line;
                let row_in_line = if text_width == 0 { 0 } else { col / text_width };
                if line_start_row + row_in_line >= rows.len() {
                    // Cursor sits just past a full row: give it a row
                    rows.push(String::new());
                }
                cursor_row = line_start_row + row_in_line;
                let col_in_row = if text_width == 0 { 0 } else { col % text_width };
                let row = &mut rows[cursor_row];
                let byte = row
                    .char_indices()
                    .nth(col_in_row)
                    .map_or(row.len(), |(i, _)| i);
                if self.focused {
                    row.insert(byte, '█');
                }
            }
            // +1 for the newline character
            chars_before_line += line_len + 1;
        }

        (rows, cursor_row)
    }
}

impl Widget for InputBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(self.theme.border_active)
        } else {
            Style::default().fg(self.theme.border)
        };

        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style);
        if self.scroll {
            block = block.title_bottom(Line::styled(" scroll ", self.theme.dim()).right_aligned());
        }

        let inner = block.inner(area);
        if inner.height < 1 || inner.width < 1 {
            block.render(area, buf);
            return;
        }

        let prompt = "> ";
        let text_width = (inner.width as usize).saturating_sub(prompt.len());

        if self.input.is_empty() {
            let mut line = prompt.to_string();
            if self.focused {
                line.push('█');
            }
            let paragraph = Paragraph::new(vec![
                Line::from(line),
                Line::styled(format!("  {}", self.placeholder), self.theme.dim()),
            ])
            .block(block);
            paragraph.render(area, buf);
            return;
        }

        let (rows, cursor_row) = self.build_rows(text_width);

        // Keep the caret visible when the content is taller than the box
        let visible = inner.height as usize;
        let offset = if rows.len() <= visible || !self.focused {
            0
        } else {
            cursor_row.saturating_sub(visible.saturating_sub(1))
        };

        let lines: Vec<Line<'_>> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let prefix = if i == 0 { prompt } else { "  " };
                Line::from(format!("{prefix}{row}"))
            })
            .collect();

        #[allow(clippy::cast_possible_truncation)]
        let paragraph = Paragraph::new(lines)
            .block(block)
            .style(Style::default().fg(self.theme.text))
            .scroll((offset as u16, 0));
        paragraph.render(area, buf);
    }
}
