//! Headless mode for the quilt TUI.
//!
//! Runs the full app against a test backend: keystrokes are sent via
//! channels and screen state is captured after each render. This enables
//! end-to-end testing and automation without a real terminal.

use crate::app::App;
use crate::event::{key_to_action, Action};
use crate::{draw_app, route_key};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use quilt_engine::{ChatStore, PaneId};
use ratatui::{backend::TestBackend, buffer::Buffer, layout::Rect, Terminal};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Default terminal dimensions for headless mode.
pub const DEFAULT_WIDTH: u16 = 100;
pub const DEFAULT_HEIGHT: u16 = 30;

/// Input fed into the headless TUI.
#[derive(Debug, Clone)]
pub enum HeadlessInput {
    /// A raw key event, routed exactly like the live event loop.
    Key(KeyEvent),
    /// A direct action, bypassing key translation.
    Action(Action),
}

/// State captured from the headless TUI after each render.
#[derive(Debug, Clone, Default)]
pub struct HeadlessState {
    /// Number of panes in the registry.
    pub pane_count: usize,
    /// The active pane, if any.
    pub active_pane: Option<PaneId>,
    /// Draft content of the focused pane.
    pub focused_draft: String,
    /// Text contents of the terminal buffer.
    pub screen_contents: String,
    /// Whether the TUI should quit.
    pub should_quit: bool,
    /// Whether the help overlay is visible.
    pub show_help: bool,
}

/// Handle to control a headless TUI instance.
pub struct HeadlessHandle {
    input_tx: mpsc::UnboundedSender<HeadlessInput>,
    state_rx: watch::Receiver<HeadlessState>,
}

impl HeadlessHandle {
    /// Send a raw key event. Returns `true` if it was accepted.
    pub fn send_key(&self, key: KeyEvent) -> bool {
        self.input_tx.send(HeadlessInput::Key(key)).is_ok()
    }

    /// Press a key with modifiers.
    pub fn press(&self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        self.send_key(KeyEvent::new(code, modifiers))
    }

    /// Type a string, one character event at a time.
    pub fn type_str(&self, text: &str) {
        for ch in text.chars() {
            self.press(KeyCode::Char(ch), KeyModifiers::NONE);
        }
    }

    /// Send a direct action.
    pub fn send_action(&self, action: Action) -> bool {
        self.input_tx.send(HeadlessInput::Action(action)).is_ok()
    }

    /// Get the current state of the TUI.
    pub fn state(&self) -> HeadlessState {
        self.state_rx.borrow().clone()
    }

    /// Wait until a condition is met on the state.
    ///
    /// Returns the state when the condition is met, or `None` if timed
    /// out.
    pub async fn wait_for<F>(&mut self, condition: F, timeout: Duration) -> Option<HeadlessState>
    where
        F: Fn(&HeadlessState) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let state = self.state();
            if condition(&state) {
                return Some(state);
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }

            if tokio::time::timeout(remaining, self.state_rx.changed())
                .await
                .is_err()
            {
                return None;
            }
        }
    }

    /// Wait for specific text to appear on screen.
    pub async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> Option<HeadlessState> {
        let text = text.to_string();
        self.wait_for(|s| s.screen_contents.contains(&text), timeout)
            .await
    }
}

/// Configuration for headless mode.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Terminal width.
    pub width: u16,
    /// Terminal height.
    pub height: u16,
    /// Tick rate in milliseconds.
    pub tick_rate_ms: u64,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            tick_rate_ms: 10, // Fast ticks for testing
        }
    }
}

/// Run the TUI in headless mode over the given store.
///
/// Returns a handle to control the TUI and a join handle for the
/// background task.
pub fn run_app_headless(
    store: Arc<ChatStore>,
    config: HeadlessConfig,
) -> (HeadlessHandle, JoinHandle<Result<(), String>>) {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(HeadlessState::default());

    let task = tokio::spawn(async move {
        run_headless_loop(store, config, input_rx, state_tx)
            .await
            .map_err(|e| e.to_string())
    });

    (HeadlessHandle { input_tx, state_rx }, task)
}

async fn run_headless_loop(
    store: Arc<ChatStore>,
    config: HeadlessConfig,
    mut input_rx: mpsc::UnboundedReceiver<HeadlessInput>,
    state_tx: watch::Sender<HeadlessState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let backend = TestBackend::new(config.width, config.height);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::init(store).await?;
    let tick_duration = Duration::from_millis(config.tick_rate_ms);

    loop {
        // Absorb completed bridge work before rendering
        app.tick();

        app.refresh_input_sizes(Rect::new(0, 0, config.width, config.height));
        terminal.draw(|frame| draw_app(&app, frame))?;

        let focused_draft = app
            .focused_pane()
            .and_then(|pane| app.input_for(pane))
            .map(|input| input.content().to_string())
            .unwrap_or_default();

        let _ = state_tx.send(HeadlessState {
            pane_count: app.pane_count(),
            active_pane: app.active_pane(),
            focused_draft,
            screen_contents: buffer_to_string(terminal.backend().buffer()),
            should_quit: app.should_quit,
            show_help: app.show_help,
        });

        if app.should_quit {
            break;
        }

        // Wait for input or tick
        let input = tokio::select! {
            input = input_rx.recv() => input,
            () = tokio::time::sleep(tick_duration) => None,
        };

        match input {
            Some(HeadlessInput::Key(key)) => {
                if !route_key(&mut app, key) {
                    app.handle_action(key_to_action(key));
                }
            }
            Some(HeadlessInput::Action(action)) => app.handle_action(action),
            None => {}
        }
    }

    Ok(())
}

/// Convert a terminal buffer to a string representation.
fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut result = String::new();

    for y in area.y..area.y + area.height {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buffer.cell((x, y)) {
                result.push_str(cell.symbol());
            }
        }
        while result.ends_with(' ') {
            result.pop();
        }
        result.push('\n');
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use quilt_engine::ConversationBridge;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_newpane_flow_end_to_end() {
        let store = Arc::new(ChatStore::in_memory());
        let (mut handle, task) = run_app_headless(store.clone(), HeadlessConfig::default());

        handle
            .wait_for(|s| s.pane_count == 1, TIMEOUT)
            .await
            .expect("initial pane");
        let origin = handle.state().active_pane;

        handle.type_str("/newpane buy milk");
        handle.press(KeyCode::Enter, KeyModifiers::NONE);

        let state = handle
            .wait_for(|s| s.pane_count == 2, TIMEOUT)
            .await
            .expect("second pane opens");
        assert_ne!(state.active_pane, origin);

        // The first message shows up on screen
        handle
            .wait_for_text("buy milk", TIMEOUT)
            .await
            .expect("message visible");

        // Exactly one new conversation, holding exactly one message,
        // and the origin conversation got nothing
        let records = store.conversations();
        assert_eq!(records.len(), 2);
        let counts: Vec<usize> = records.iter().map(|r| store.messages(&r.id).len()).collect();
        assert_eq!(counts.iter().sum::<usize>(), 1);

        handle.send_action(Action::Quit);
        let _ = task.await;
    }

    #[tokio::test]
    async fn test_modified_enter_never_submits() {
        let store = Arc::new(ChatStore::in_memory());
        let (mut handle, task) = run_app_headless(store.clone(), HeadlessConfig::default());

        handle
            .wait_for(|s| s.pane_count == 1, TIMEOUT)
            .await
            .expect("initial pane");

        handle.type_str("draft text");
        handle.press(KeyCode::Enter, KeyModifiers::SHIFT);

        let state = handle
            .wait_for(|s| s.focused_draft == "draft text\n", TIMEOUT)
            .await
            .expect("newline inserted");
        assert_eq!(state.pane_count, 1);

        let conversation = store.conversations()[0].id.clone();
        assert!(store.messages(&conversation).is_empty());

        handle.send_action(Action::Quit);
        let _ = task.await;
    }

    #[tokio::test]
    async fn test_plain_enter_submits_and_clears_draft() {
        let store = Arc::new(ChatStore::in_memory());
        let (mut handle, task) = run_app_headless(store.clone(), HeadlessConfig::default());

        handle
            .wait_for(|s| s.pane_count == 1, TIMEOUT)
            .await
            .expect("initial pane");

        handle.type_str("hi there");
        handle
            .wait_for(|s| s.focused_draft == "hi there", TIMEOUT)
            .await
            .expect("draft typed");
        handle.press(KeyCode::Enter, KeyModifiers::NONE);

        handle
            .wait_for(
                |s| s.focused_draft.is_empty() && s.screen_contents.contains("hi there"),
                TIMEOUT,
            )
            .await
            .expect("draft cleared and message shown");

        let conversation = store.conversations()[0].id.clone();
        let messages = store.messages(&conversation);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hi there");

        handle.send_action(Action::Quit);
        let _ = task.await;
    }

    #[tokio::test]
    async fn test_messages_persist_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Arc::new(ChatStore::open(dir.path()).unwrap());
            let (mut handle, task) = run_app_headless(store, HeadlessConfig::default());
            handle
                .wait_for(|s| s.pane_count == 1, TIMEOUT)
                .await
                .expect("initial pane");

            handle.type_str("remember this");
            handle.press(KeyCode::Enter, KeyModifiers::NONE);
            // Draft cleared and the message visible in the transcript
            handle
                .wait_for(
                    |s| s.focused_draft.is_empty() && s.screen_contents.contains("remember this"),
                    TIMEOUT,
                )
                .await
                .expect("delivered");

            handle.send_action(Action::Quit);
            let _ = task.await;
        }

        let reopened = ChatStore::open(dir.path()).unwrap();
        let records = reopened.conversations();
        assert_eq!(records.len(), 1);
        let messages = reopened.messages(&records[0].id);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "remember this");
    }

    #[tokio::test]
    async fn test_close_pane_action() {
        let store = Arc::new(ChatStore::in_memory());
        let (mut handle, task) = run_app_headless(store, HeadlessConfig::default());

        handle
            .wait_for(|s| s.pane_count == 1, TIMEOUT)
            .await
            .expect("initial pane");

        handle.type_str("/newpane side quest");
        handle.press(KeyCode::Enter, KeyModifiers::NONE);
        handle
            .wait_for(|s| s.pane_count == 2, TIMEOUT)
            .await
            .expect("second pane");

        handle.send_action(Action::ClosePane);
        let state = handle
            .wait_for(|s| s.pane_count == 1, TIMEOUT)
            .await
            .expect("pane closed");
        assert!(state.active_pane.is_some());

        handle.send_action(Action::Quit);
        let _ = task.await;
    }
}
