//! Application state and update logic for the quilt TUI.

use std::collections::HashMap;
use std::sync::Arc;

use quilt_engine::{
    compute_input_size, BridgeError, ChatStore, Conversation, ConversationBridge, ConversationId,
    InputSize, Message, Orchestrator, Pane, PaneId, PaneNotice, SubmitOutcome, ViewportMetrics,
    MIN_HEIGHT,
};
use ratatui::layout::{Constraint, Layout, Rect};
use tokio::sync::watch;

use crate::event::Action;
use crate::theme::Theme;
use crate::widgets::{display_rows, TextInputState, CLOSE_HIT_WIDTH};

/// Nominal height of one terminal cell in device-independent pixels;
/// maps the sizing computation onto rows.
pub const CELL_HEIGHT_PX: f32 = 16.0;

/// Ticks a notice stays visible (~3 seconds at the 250ms tick rate).
const NOTICE_TTL: usize = 12;

#[derive(Debug, Clone)]
struct Notice {
    text: String,
    ttl: usize,
}

/// Application state.
pub struct App {
    /// Whether the app should quit.
    pub should_quit: bool,

    /// Whether the help overlay is visible.
    pub show_help: bool,

    /// Colors for the pane widgets.
    pub theme: Theme,

    store: Arc<ChatStore>,
    orchestrator: Orchestrator,

    /// Per-pane draft inputs.
    inputs: HashMap<PaneId, TextInputState>,

    /// Last computed input size per pane; kept when unmeasurable.
    input_sizes: HashMap<PaneId, InputSize>,

    /// Live conversation records, one subscription per pane.
    records: HashMap<PaneId, watch::Receiver<Conversation>>,

    /// Transcript scroll per pane, in lines up from the bottom.
    transcript_scroll: HashMap<PaneId, usize>,

    /// Per-pane error notices.
    pane_notices: HashMap<PaneId, Notice>,

    /// Notice with no surviving pane to attach to.
    global_notice: Option<Notice>,
}

impl App {
    /// Create the app over a store, opening the most recent conversation
    /// in a pane (creating one when the store is empty).
    pub async fn init(store: Arc<ChatStore>) -> Result<Self, BridgeError> {
        let mut orchestrator = Orchestrator::new(store.clone());

        let conversation = match store.conversations().last() {
            Some(record) => record.id.clone(),
            None => store.create_conversation(None).await?,
        };
        let pane = orchestrator.open_conversation(conversation, true);

        let mut app = Self {
            should_quit: false,
            show_help: false,
            theme: Theme::default(),
            store,
            orchestrator,
            inputs: HashMap::new(),
            input_sizes: HashMap::new(),
            records: HashMap::new(),
            transcript_scroll: HashMap::new(),
            pane_notices: HashMap::new(),
            global_notice: None,
        };
        app.ensure_pane_state(pane);
        Ok(app)
    }

    /// The store behind the orchestrator.
    pub fn store(&self) -> &Arc<ChatStore> {
        &self.store
    }

    /// Panes in display order.
    pub fn panes(&self) -> impl Iterator<Item = &Pane> {
        self.orchestrator.panes().all()
    }

    pub fn pane_count(&self) -> usize {
        self.orchestrator.panes().len()
    }

    pub fn active_pane(&self) -> Option<PaneId> {
        self.orchestrator.active_pane()
    }

    /// The pane whose input receives keystrokes: active and bound.
    pub fn focused_pane(&self) -> Option<PaneId> {
        self.orchestrator.focused_pane()
    }

    /// Draft input of the focused pane.
    pub fn active_input(&mut self) -> Option<&mut TextInputState> {
        let pane = self.orchestrator.focused_pane()?;
        self.inputs.get_mut(&pane)
    }

    /// Open a conversation in a pane (shell-facing hook).
    pub fn open_conversation(&mut self, conversation: ConversationId, open_in_new_pane: bool) {
        let pane = self
            .orchestrator
            .open_conversation(conversation, open_in_new_pane);
        self.ensure_pane_state(pane);
    }

    /// Submit the focused pane's draft.
    ///
    /// The draft is cleared the moment the submission is accepted; it is
    /// not restored if delivery later fails.
    pub fn submit_active(&mut self) {
        let Some(pane) = self.orchestrator.focused_pane() else {
            return;
        };
        let draft = match self.inputs.get(&pane) {
            Some(input) => input.content().to_string(),
            None => return,
        };

        let outcome = self.orchestrator.submit(pane, &draft);
        if outcome != SubmitOutcome::Ignored {
            if let Some(input) = self.inputs.get_mut(&pane) {
                input.submit();
            }
            self.transcript_scroll.insert(pane, 0);
        }
    }

    /// Handle a non-typing action.
    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Help => self.show_help = !self.show_help,
            Action::Back => self.show_help = false,
            Action::NextPane => self.cycle_active(1),
            Action::PrevPane => self.cycle_active(-1),
            Action::ClosePane => {
                if let Some(active) = self.orchestrator.active_pane() {
                    self.close_pane(active);
                }
            }
            Action::ScrollUp => self.scroll_active(3),
            Action::ScrollDown => self.scroll_active(-3),
            Action::None => {}
        }
    }

    /// Advance time-based state and absorb completed bridge work.
    pub fn tick(&mut self) {
        for notice in self.orchestrator.process_events() {
            match notice {
                PaneNotice::PaneOpened { pane } => self.ensure_pane_state(pane),
                PaneNotice::CommandFailed { pane, error } => {
                    self.push_notice(pane, format!("Command failed: {error}"));
                }
                PaneNotice::SendFailed { pane, error } => {
                    self.push_notice(pane, format!("Send failed: {error}"));
                }
            }
        }

        self.pane_notices.retain(|_, notice| {
            notice.ttl -= 1;
            notice.ttl > 0
        });
        if let Some(notice) = &mut self.global_notice {
            notice.ttl -= 1;
            if notice.ttl == 0 {
                self.global_notice = None;
            }
        }
    }

    /// Close a pane and drop its UI state.
    pub fn close_pane(&mut self, pane: PaneId) {
        self.orchestrator.close_pane(pane);
        self.inputs.remove(&pane);
        self.input_sizes.remove(&pane);
        self.records.remove(&pane);
        self.transcript_scroll.remove(&pane);
        self.pane_notices.remove(&pane);
    }

    /// Handle a mouse click: the close control closes, anywhere else on a
    /// pane activates it.
    pub fn click(&mut self, column: u16, row: u16, area: Rect) {
        for (pane, rect) in self.pane_layout(area) {
            let inside = column >= rect.x
                && column < rect.x + rect.width
                && row >= rect.y
                && row < rect.y + rect.height;
            if !inside {
                continue;
            }
            let on_close = row == rect.y && column >= rect.right().saturating_sub(CLOSE_HIT_WIDTH);
            if on_close {
                self.close_pane(pane);
            } else {
                self.orchestrator.activate(pane);
            }
            return;
        }
    }

    /// Pane rectangles for `area`, leaving one row of hints at the
    /// bottom. Used by both rendering and mouse hit-testing.
    #[allow(clippy::cast_possible_truncation)]
    pub fn pane_layout(&self, area: Rect) -> Vec<(PaneId, Rect)> {
        let [panes_area, _hints] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);

        let ids: Vec<PaneId> = self.orchestrator.panes().all().map(Pane::id).collect();
        if ids.is_empty() {
            return Vec::new();
        }
        let constraints: Vec<Constraint> = ids
            .iter()
            .map(|_| Constraint::Ratio(1, ids.len() as u32))
            .collect();
        let rects = Layout::horizontal(constraints).split(panes_area);
        ids.into_iter().zip(rects.iter().copied()).collect()
    }

    /// Recompute input sizes from the current drafts and layout.
    ///
    /// Panes that cannot be measured (zero-sized rects) keep their
    /// previous size.
    #[allow(clippy::cast_precision_loss)]
    pub fn refresh_input_sizes(&mut self, area: Rect) {
        for (pane, rect) in self.pane_layout(area) {
            // Pane borders, input borders, then the "> " prompt
            let natural = if rect.width > 6 && rect.height > 0 {
                let content = self.inputs.get(&pane).map_or("", TextInputState::content);
                let rows = display_rows(content, rect.width - 6);
                Some(rows as f32 * CELL_HEIGHT_PX)
            } else {
                None
            };
            let metrics = ViewportMetrics {
                viewport_height: f32::from(rect.height) * CELL_HEIGHT_PX,
                line_height: CELL_HEIGHT_PX,
            };
            if let Some(size) = compute_input_size(natural, metrics) {
                self.input_sizes.insert(pane, size);
            }
        }
    }

    /// Last computed input size for a pane.
    pub fn input_size_for(&self, pane: PaneId) -> InputSize {
        self.input_sizes
            .get(&pane)
            .copied()
            .unwrap_or(InputSize {
                height: MIN_HEIGHT,
                scroll: false,
                animate: false,
            })
    }

    /// Input surface height in content rows.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn input_rows_for(&self, pane: PaneId) -> u16 {
        (self.input_size_for(pane).height / CELL_HEIGHT_PX).ceil() as u16
    }

    /// Display title of the pane's conversation.
    pub fn title_for(&self, pane: PaneId) -> String {
        self.records.get(&pane).map_or_else(
            || "New conversation".to_string(),
            |record| record.borrow().display_title().to_string(),
        )
    }

    /// Messages of the pane's conversation, in delivery order.
    pub fn messages_for(&self, pane: PaneId) -> Vec<Message> {
        self.orchestrator
            .panes()
            .get(pane)
            .and_then(Pane::conversation)
            .map(|conversation| self.store.messages(conversation))
            .unwrap_or_default()
    }

    pub fn input_for(&self, pane: PaneId) -> Option<&TextInputState> {
        self.inputs.get(&pane)
    }

    pub fn notice_for(&self, pane: PaneId) -> Option<&str> {
        self.pane_notices.get(&pane).map(|n| n.text.as_str())
    }

    pub fn global_notice(&self) -> Option<&str> {
        self.global_notice.as_ref().map(|n| n.text.as_str())
    }

    pub fn scroll_for(&self, pane: PaneId) -> usize {
        self.transcript_scroll.get(&pane).copied().unwrap_or(0)
    }

    fn ensure_pane_state(&mut self, pane: PaneId) {
        self.inputs.entry(pane).or_default();
        self.transcript_scroll.entry(pane).or_insert(0);
        if !self.records.contains_key(&pane) {
            let conversation = self
                .orchestrator
                .panes()
                .get(pane)
                .and_then(|p| p.conversation().cloned());
            if let Some(conversation) = conversation {
                if let Ok(record) = self.store.watch_conversation(&conversation) {
                    self.records.insert(pane, record);
                }
            }
        }
    }

    fn push_notice(&mut self, pane: Option<PaneId>, text: String) {
        let notice = Notice {
            text,
            ttl: NOTICE_TTL,
        };
        match pane {
            Some(pane) => {
                self.pane_notices.insert(pane, notice);
            }
            None => self.global_notice = Some(notice),
        }
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn cycle_active(&mut self, delta: isize) {
        let ids: Vec<PaneId> = self.orchestrator.panes().all().map(Pane::id).collect();
        if ids.is_empty() {
            return;
        }
        let current = self
            .orchestrator
            .active_pane()
            .and_then(|active| ids.iter().position(|&id| id == active))
            .unwrap_or(0);
        let len = ids.len() as isize;
        let next = (current as isize + delta).rem_euclid(len) as usize;
        self.orchestrator.activate(ids[next]);
    }

    fn scroll_active(&mut self, delta: isize) {
        let Some(active) = self.orchestrator.active_pane() else {
            return;
        };
        let scroll = self.transcript_scroll.entry(active).or_insert(0);
        if delta > 0 {
            *scroll = scroll.saturating_add(delta.unsigned_abs());
        } else {
            *scroll = scroll.saturating_sub(delta.unsigned_abs());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn test_app() -> App {
        let store = Arc::new(ChatStore::in_memory());
        App::init(store).await.unwrap()
    }

    /// Tick until `predicate` holds or time runs out.
    async fn tick_until<F>(app: &mut App, mut predicate: F) -> bool
    where
        F: FnMut(&App) -> bool,
    {
        for _ in 0..200 {
            app.tick();
            if predicate(app) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_init_opens_one_pane() {
        let app = test_app().await;
        assert_eq!(app.pane_count(), 1);
        assert!(app.focused_pane().is_some());
        assert_eq!(app.active_pane(), app.focused_pane());
    }

    #[tokio::test]
    async fn test_submit_clears_draft_and_delivers() {
        let mut app = test_app().await;
        let pane = app.focused_pane().unwrap();

        app.active_input().unwrap().insert_str("hello");
        app.submit_active();
        assert!(app.input_for(pane).unwrap().is_empty());

        let store = app.store().clone();
        let conversation = store.conversations()[0].id.clone();
        let delivered =
            tick_until(&mut app, |_| store.messages(&conversation).len() == 1).await;
        assert!(delivered);
        assert_eq!(store.messages(&conversation)[0].content, "hello");
    }

    #[tokio::test]
    async fn test_empty_submit_keeps_draft_untouched() {
        let mut app = test_app().await;
        let pane = app.focused_pane().unwrap();

        app.submit_active();
        assert!(app.input_for(pane).unwrap().is_empty());
        assert_eq!(app.pane_count(), 1);
    }

    #[tokio::test]
    async fn test_newpane_command_opens_and_focuses_new_pane() {
        let mut app = test_app().await;
        let origin = app.focused_pane().unwrap();

        app.active_input().unwrap().insert_str("/newpane buy milk");
        app.submit_active();

        let opened = tick_until(&mut app, |app| app.pane_count() == 2).await;
        assert!(opened);

        let active = app.active_pane().unwrap();
        assert_ne!(active, origin);
        // The new pane is focused and has its own empty draft
        assert_eq!(app.focused_pane(), Some(active));
        assert!(app.input_for(active).unwrap().is_empty());

        // The message landed in the new conversation only
        let store = app.store().clone();
        let records = store.conversations();
        assert_eq!(records.len(), 2);
        let delivered = tick_until(&mut app, |_| {
            records
                .iter()
                .any(|r| store.messages(&r.id).iter().any(|m| m.content == "buy milk"))
        })
        .await;
        assert!(delivered);
        let with_messages: Vec<usize> = records
            .iter()
            .map(|r| store.messages(&r.id).len())
            .collect();
        assert_eq!(with_messages.iter().sum::<usize>(), 1);
    }

    #[tokio::test]
    async fn test_close_active_pane_keeps_one_active() {
        let mut app = test_app().await;
        let origin = app.focused_pane().unwrap();

        app.active_input().unwrap().insert_str("/newpane second");
        app.submit_active();
        tick_until(&mut app, |app| app.pane_count() == 2).await;

        let active = app.active_pane().unwrap();
        app.close_pane(active);
        assert_eq!(app.pane_count(), 1);
        assert_eq!(app.active_pane(), Some(origin));

        app.close_pane(origin);
        assert_eq!(app.pane_count(), 0);
        assert!(app.active_pane().is_none());
        assert!(app.focused_pane().is_none());
    }

    #[tokio::test]
    async fn test_cycle_active_wraps() {
        let mut app = test_app().await;
        let first = app.active_pane().unwrap();

        app.active_input().unwrap().insert_str("/newpane two");
        app.submit_active();
        tick_until(&mut app, |app| app.pane_count() == 2).await;
        let second = app.active_pane().unwrap();

        app.handle_action(Action::NextPane);
        assert_eq!(app.active_pane(), Some(first));
        app.handle_action(Action::NextPane);
        assert_eq!(app.active_pane(), Some(second));
        app.handle_action(Action::PrevPane);
        assert_eq!(app.active_pane(), Some(first));
    }

    #[tokio::test]
    async fn test_input_sizes_follow_draft_growth() {
        let mut app = test_app().await;
        let pane = app.focused_pane().unwrap();
        let area = Rect::new(0, 0, 80, 30);

        app.refresh_input_sizes(area);
        let empty = app.input_size_for(pane);
        assert_eq!(empty.height, MIN_HEIGHT);
        assert!(!empty.scroll);

        // A tall draft clamps and scrolls
        let tall = "line\n".repeat(40);
        app.active_input().unwrap().insert_str(&tall);
        app.refresh_input_sizes(area);
        let clamped = app.input_size_for(pane);
        assert!(clamped.scroll);
        assert!(clamped.height < tall.lines().count() as f32 * CELL_HEIGHT_PX);
    }

    #[tokio::test]
    async fn test_unmeasurable_area_keeps_previous_size() {
        let mut app = test_app().await;
        let pane = app.focused_pane().unwrap();

        app.refresh_input_sizes(Rect::new(0, 0, 80, 30));
        let before = app.input_size_for(pane);

        app.refresh_input_sizes(Rect::new(0, 0, 0, 0));
        assert_eq!(app.input_size_for(pane), before);
    }

    #[tokio::test]
    async fn test_click_activates_and_close_control_closes() {
        let mut app = test_app().await;
        let origin = app.focused_pane().unwrap();

        app.active_input().unwrap().insert_str("/newpane two");
        app.submit_active();
        tick_until(&mut app, |app| app.pane_count() == 2).await;

        let area = Rect::new(0, 0, 80, 24);
        let layout = app.pane_layout(area);
        let (first_pane, first_rect) = layout[0];
        assert_eq!(first_pane, origin);

        // Click in the body of the first pane activates it
        app.click(first_rect.x + 2, first_rect.y + 2, area);
        assert_eq!(app.active_pane(), Some(origin));

        // Click on the close control of the first pane closes it
        app.click(first_rect.right() - 2, first_rect.y, area);
        assert_eq!(app.pane_count(), 1);
        assert_ne!(app.active_pane(), Some(origin));
    }
}
