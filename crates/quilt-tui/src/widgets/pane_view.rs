//! One conversation pane: title bar, transcript, notice line, and the
//! draft input at the bottom.

use quilt_engine::{Message, Role};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::theme::Theme;
use crate::widgets::{InputBar, TextInputState};

/// Width of the close control hit area at the right end of the title row.
pub const CLOSE_HIT_WIDTH: u16 = 4;

/// Widget for a single pane.
pub struct PaneView<'a> {
    title: &'a str,
    active: bool,
    focused: bool,
    messages: &'a [Message],
    scroll_from_bottom: usize,
    notice: Option<&'a str>,
    input: &'a TextInputState,
    input_rows: u16,
    input_scroll: bool,
    theme: &'a Theme,
}

impl<'a> PaneView<'a> {
    pub fn new(
        title: &'a str,
        messages: &'a [Message],
        input: &'a TextInputState,
        theme: &'a Theme,
    ) -> Self {
        Self {
            title,
            active: false,
            focused: false,
            messages,
            scroll_from_bottom: 0,
            notice: None,
            input,
            input_rows: 3,
            input_scroll: false,
            theme,
        }
    }

    /// Set whether this pane is the active one.
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set whether this pane's input holds focus.
    #[must_use]
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Transcript scroll position, in lines up from the bottom.
    #[must_use]
    pub fn scroll_from_bottom(mut self, lines: usize) -> Self {
        self.scroll_from_bottom = lines;
        self
    }

    /// Set an error notice shown above the input.
    #[must_use]
    pub fn notice(mut self, notice: Option<&'a str>) -> Self {
        self.notice = notice;
        self
    }

    /// Content rows for the input surface.
    #[must_use]
    pub fn input_rows(mut self, rows: u16) -> Self {
        self.input_rows = rows;
        self
    }

    /// Set clamped mode for the input surface.
    #[must_use]
    pub fn input_scroll(mut self, scroll: bool) -> Self {
        self.input_scroll = scroll;
        self
    }

    fn role_label(&self, role: Role) -> Span<'static> {
        match role {
            Role::User => Span::styled(
                "you",
                Style::default()
                    .fg(self.theme.user)
                    .add_modifier(Modifier::BOLD),
            ),
            Role::Assistant => Span::styled(
                "assistant",
                Style::default()
                    .fg(self.theme.assistant)
                    .add_modifier(Modifier::BOLD),
            ),
            Role::System => Span::styled("system", self.theme.dim()),
        }
    }

    /// Build the transcript lines, word-wrapped at `width`.
    fn transcript_lines(&self, width: u16) -> Vec<Line<'static>> {
        let width = width.max(1) as usize;
        let mut lines = Vec::new();

        for message in self.messages {
            let stamp = message.timestamp.format("%H:%M").to_string();
            lines.push(Line::from(vec![
                self.role_label(message.role),
                Span::raw(" "),
                Span::styled(stamp, self.theme.dim()),
            ]));

            for part in message.content.split('\n') {
                if part.is_empty() {
                    lines.push(Line::raw(""));
                    continue;
                }
                for wrapped in textwrap::wrap(part, width) {
                    lines.push(Line::raw(wrapped.into_owned()));
                }
            }
            lines.push(Line::raw(""));
        }

        lines
    }
}

impl Widget for PaneView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.active {
            Style::default().fg(self.theme.border_active)
        } else {
            Style::default().fg(self.theme.border)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title_top(Line::from(format!(" {} ", self.title)).left_aligned())
            .title_top(Line::styled(" ✕ ", self.theme.dim()).right_aligned());

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height < 1 || inner.width < 1 {
            return;
        }

        let input_height = self.input_rows + 2;
        let mut constraints = vec![Constraint::Min(1)];
        if self.notice.is_some() {
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Length(input_height));
        let chunks = Layout::vertical(constraints).split(inner);

        // Transcript pinned to the bottom, scrolled up by request
        let transcript_area = chunks[0];
        let lines = self.transcript_lines(transcript_area.width);
        let total = lines.len();
        let visible = transcript_area.height as usize;
        let skip = total
            .saturating_sub(visible)
            .saturating_sub(self.scroll_from_bottom.min(total.saturating_sub(visible)));
        #[allow(clippy::cast_possible_truncation)]
        Paragraph::new(lines)
            .scroll((skip as u16, 0))
            .render(transcript_area, buf);

        if let Some(notice) = self.notice {
            let notice_area = chunks[1];
            Paragraph::new(Line::styled(notice.to_string(), self.theme.alert()))
                .render(notice_area, buf);
        }

        let input_area = chunks[chunks.len() - 1];
        InputBar::new(self.input, self.theme)
            .focused(self.focused)
            .scroll(self.input_scroll)
            .placeholder("Type a message, or /newpane <message>")
            .render(input_area, buf);
    }
}
