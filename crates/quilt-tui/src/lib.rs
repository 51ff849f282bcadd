//! quilt-tui: Terminal UI for the quilt multi-pane chat client
//!
//! This crate provides the TUI layer for quilt, including:
//! - Side-by-side conversation panes with per-pane draft inputs
//! - Keystroke routing (bare Enter submits, modified Enter breaks lines)
//! - Mouse activation and close controls
//! - Headless mode for testing and automation

pub mod app;
mod event;
pub mod headless;
mod theme;
mod widgets;

pub use app::App;
pub use event::{key_to_action, Action, Event, EventHandler};
pub use quilt_engine;
pub use theme::Theme;

use crossterm::{
    cursor::Show as ShowCursor,
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyEvent, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use quilt_engine::ChatStore;
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Rect, Size},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame, Terminal,
};
use std::io::{self, stdout};
use std::path::Path;
use std::sync::Arc;

use widgets::PaneView;

const HINTS: &str =
    " Enter send · /newpane <msg> new pane · Tab switch · Ctrl+W close · F1 help · Ctrl+C quit";

/// RAII guard for terminal state restoration.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), DisableMouseCapture, LeaveAlternateScreen, ShowCursor);
    }
}

/// Run the TUI application over a store rooted at `data_dir`.
///
/// Sets up the terminal, runs the event loop, and restores the terminal
/// on exit.
pub async fn run_tui(data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(ChatStore::open(data_dir)?);

    // Setup terminal with RAII guard for cleanup
    enable_raw_mode()?;
    let _guard = TerminalGuard;

    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::init(store).await?;

    // Create event handler (4 Hz tick rate = 250ms)
    let mut events = EventHandler::new(250);

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    // Restore cursor before guard drops
    terminal.show_cursor()?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventHandler,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let size = terminal.size()?;
        app.refresh_input_sizes(Rect::new(0, 0, size.width, size.height));

        terminal.draw(|frame| draw_app(app, frame))?;

        if let Some(event) = events.next().await {
            match event {
                Event::Key(key) => {
                    if !route_key(app, key) {
                        app.handle_action(key_to_action(key));
                    }
                }
                Event::Mouse(mouse) => handle_mouse(app, mouse, terminal.size()?),
                Event::Tick => app.tick(),
                Event::Resize(_, _) => {
                    // Sizes are recomputed at the top of the loop
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, size: Size) {
    let area = Rect::new(0, 0, size.width, size.height);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.click(mouse.column, mouse.row, area),
        MouseEventKind::ScrollUp => app.handle_action(Action::ScrollUp),
        MouseEventKind::ScrollDown => app.handle_action(Action::ScrollDown),
        _ => {}
    }
}

/// Route a key to the focused pane's draft input.
///
/// Returns `true` if the key was consumed; anything declined falls
/// through to [`key_to_action`].
pub(crate) fn route_key(app: &mut App, key: KeyEvent) -> bool {
    use crossterm::event::{KeyCode, KeyModifiers};

    // Any key dismisses the help overlay
    if app.show_help {
        app.show_help = false;
        return true;
    }

    // A submission is Enter with no modifier held; Enter with any
    // modifier inserts a literal newline instead
    if key.code == KeyCode::Enter {
        if app.focused_pane().is_none() {
            return false;
        }
        let modified = key.modifiers.intersects(
            KeyModifiers::SHIFT
                | KeyModifiers::CONTROL
                | KeyModifiers::ALT
                | KeyModifiers::META
                | KeyModifiers::SUPER,
        );
        if modified {
            if let Some(input) = app.active_input() {
                input.insert('\n');
            }
        } else {
            app.submit_active();
        }
        return true;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return false; // Ctrl+C, Ctrl+W and friends are actions
    }

    let Some(input) = app.active_input() else {
        return false;
    };
    match key.code {
        KeyCode::Char(c) => {
            input.insert(c);
            true
        }
        KeyCode::Backspace => {
            input.backspace();
            true
        }
        KeyCode::Delete => {
            input.delete();
            true
        }
        KeyCode::Left => {
            input.move_left();
            true
        }
        KeyCode::Right => {
            input.move_right();
            true
        }
        KeyCode::Home => {
            input.move_home();
            true
        }
        KeyCode::End => {
            input.move_end();
            true
        }
        KeyCode::Up => {
            if input.is_empty() {
                input.history_prev();
                true
            } else {
                false
            }
        }
        KeyCode::Down => {
            if input.is_empty() {
                input.history_next();
                true
            } else {
                false
            }
        }
        _ => false,
    }
}

/// Draw the whole application frame.
pub(crate) fn draw_app(app: &App, frame: &mut Frame<'_>) {
    let area = frame.area();
    let buf = frame.buffer_mut();

    let layout = app.pane_layout(area);
    let active = app.active_pane();
    let focused = app.focused_pane();

    for (pane_id, rect) in &layout {
        let title = app.title_for(*pane_id);
        let messages = app.messages_for(*pane_id);
        let Some(input) = app.input_for(*pane_id) else {
            continue;
        };
        let size = app.input_size_for(*pane_id);
        PaneView::new(&title, &messages, input, &app.theme)
            .active(active == Some(*pane_id))
            .focused(focused == Some(*pane_id))
            .scroll_from_bottom(app.scroll_for(*pane_id))
            .notice(app.notice_for(*pane_id))
            .input_rows(app.input_rows_for(*pane_id))
            .input_scroll(size.scroll)
            .render(*rect, buf);
    }

    if layout.is_empty() && area.height > 1 {
        let message = Paragraph::new(Line::styled(
            "All panes closed. Ctrl+C to quit.",
            app.theme.dim(),
        ))
        .centered();
        let middle = Rect::new(area.x, area.y + area.height / 2, area.width, 1);
        message.render(middle, buf);
    }

    // Bottom line: global notice when present, key hints otherwise
    if area.height > 0 {
        let hint_area = Rect::new(area.x, area.y + area.height - 1, area.width, 1);
        let line = if let Some(notice) = app.global_notice() {
            Line::styled(notice.to_string(), app.theme.alert())
        } else {
            Line::styled(HINTS, app.theme.dim())
        };
        Paragraph::new(line).render(hint_area, buf);
    }

    if app.show_help {
        render_help_overlay(area, buf, &app.theme);
    }
}

fn render_help_overlay(area: Rect, buf: &mut Buffer, theme: &Theme) {
    let width = area.width.min(52);
    let height = area.height.min(15);
    if width < 10 || height < 5 {
        return;
    }
    let rect = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    );

    Clear.render(rect, buf);

    let mut lines = vec![
        Line::raw(" Enter          send message"),
        Line::raw(" Shift+Enter    insert newline"),
        Line::raw(" Tab/Shift+Tab  switch pane"),
        Line::raw(" Ctrl+W         close pane"),
        Line::raw(" PgUp/PgDn      scroll transcript"),
        Line::raw(" F1             toggle help"),
        Line::raw(" Ctrl+C         quit"),
        Line::raw(""),
        Line::styled(" Commands", theme.dim()),
    ];
    for command in quilt_engine::COMMANDS {
        lines.push(Line::raw(format!(
            " {:<20} {}",
            command.usage, command.description
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(ratatui::style::Style::default().fg(theme.border_active))
        .title(" Help ");
    Paragraph::new(lines).block(block).render(rect, buf);
}

/// Get the TUI version.
pub fn tui_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tui_version() {
        let version = tui_version();
        assert!(!version.is_empty());
        assert!(version.starts_with("0."));
    }
}

/// Keystroke routing tests: submissions versus literal newlines.
#[cfg(test)]
mod routing_tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};
    use quilt_engine::ConversationBridge;
    use std::time::Duration;

    async fn test_app() -> App {
        let store = Arc::new(ChatStore::in_memory());
        App::init(store).await.unwrap()
    }

    fn type_str(app: &mut App, text: &str) {
        for ch in text.chars() {
            let consumed = route_key(app, KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
            assert!(consumed);
        }
    }

    async fn settle(app: &mut App) {
        for _ in 0..20 {
            app.tick();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    #[tokio::test]
    async fn test_plain_enter_submits_and_clears() {
        let mut app = test_app().await;
        let pane = app.focused_pane().unwrap();
        type_str(&mut app, "hello");

        route_key(&mut app, KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert!(app.input_for(pane).unwrap().is_empty());

        let store = app.store().clone();
        let conversation = store.conversations()[0].id.clone();
        settle(&mut app).await;
        let messages = store.messages(&conversation);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hello");
    }

    #[tokio::test]
    async fn test_modified_enter_inserts_newline_only() {
        let mut app = test_app().await;
        let pane = app.focused_pane().unwrap();
        type_str(&mut app, "hello");

        for modifier in [
            KeyModifiers::SHIFT,
            KeyModifiers::CONTROL,
            KeyModifiers::ALT,
            KeyModifiers::META,
            KeyModifiers::SUPER,
        ] {
            route_key(&mut app, KeyEvent::new(KeyCode::Enter, modifier));
        }

        // Five newlines appended, draft never cleared
        assert_eq!(app.input_for(pane).unwrap().content(), "hello\n\n\n\n\n");

        // And nothing was enqueued
        let store = app.store().clone();
        let conversation = store.conversations()[0].id.clone();
        settle(&mut app).await;
        assert!(store.messages(&conversation).is_empty());
    }

    #[tokio::test]
    async fn test_typing_lands_in_focused_pane_draft() {
        let mut app = test_app().await;
        let pane = app.focused_pane().unwrap();

        type_str(&mut app, "/newpane later");
        assert_eq!(app.input_for(pane).unwrap().content(), "/newpane later");
    }

    #[tokio::test]
    async fn test_ctrl_keys_are_not_consumed_by_input() {
        let mut app = test_app().await;
        let quit = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(!route_key(&mut app, quit));
        app.handle_action(key_to_action(quit));
        assert!(app.should_quit);
    }
}
