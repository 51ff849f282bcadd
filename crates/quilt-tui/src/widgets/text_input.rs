//! Multi-line draft state: content, cursor, and input history.
//!
//! Cursor positions are character indices, so multi-byte input behaves.
//! The draft is transient: it is cleared on submit and never persisted.

/// State for one pane's draft input.
#[derive(Debug, Clone, Default)]
pub struct TextInputState {
    content: String,
    /// Cursor position as a character index.
    cursor: usize,
    /// Previously submitted drafts for up/down navigation.
    history: Vec<String>,
    /// Current history index (`None` = editing the live draft).
    history_index: Option<usize>,
    /// Live draft saved while navigating history.
    saved_input: String,
}

impl TextInputState {
    /// Create a new empty input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Cursor position as a character index.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Check if the content is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Clear the content.
    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Byte offset of the cursor into the content.
    fn byte_index(&self) -> usize {
        self.content
            .char_indices()
            .nth(self.cursor)
            .map_or(self.content.len(), |(i, _)| i)
    }

    /// Insert a character at the cursor position.
    pub fn insert(&mut self, ch: char) {
        let at = self.byte_index();
        self.content.insert(at, ch);
        self.cursor += 1;
    }

    /// Insert a string at the cursor position.
    pub fn insert_str(&mut self, s: &str) {
        let at = self.byte_index();
        self.content.insert_str(at, s);
        self.cursor += s.chars().count();
    }

    /// Delete the character before the cursor (backspace).
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index();
            self.content.remove(at);
        }
    }

    /// Delete the character at the cursor (delete).
    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index();
            self.content.remove(at);
        }
    }

    /// Move cursor left.
    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move cursor right.
    pub fn move_right(&mut self) {
        if self.cursor < self.char_len() {
            self.cursor += 1;
        }
    }

    /// Move cursor to start.
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// Move cursor to end.
    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    /// Take the content, clearing the state.
    pub fn take(&mut self) -> String {
        let content = std::mem::take(&mut self.content);
        self.cursor = 0;
        content
    }

    /// Record the current content in history and clear.
    pub fn submit(&mut self) -> String {
        let content = self.take();
        if !content.trim().is_empty() {
            self.history.push(content.clone());
        }
        self.history_index = None;
        self.saved_input.clear();
        content
    }

    /// Navigate to the previous history entry.
    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }

        let next_index = match self.history_index {
            None => {
                self.saved_input = self.content.clone();
                0
            }
            Some(i) if i + 1 < self.history.len() => i + 1,
            Some(i) => i,
        };
        self.history_index = Some(next_index);
        self.content = self.history[self.history.len() - 1 - next_index].clone();
        self.cursor = self.char_len();
    }

    /// Navigate to the next history entry, back toward the live draft.
    pub fn history_next(&mut self) {
        match self.history_index {
            None => {}
            Some(0) => {
                self.history_index = None;
                self.content = std::mem::take(&mut self.saved_input);
                self.cursor = self.char_len();
            }
            Some(i) => {
                self.history_index = Some(i - 1);
                self.content = self.history[self.history.len() - i].clone();
                self.cursor = self.char_len();
            }
        }
    }
}
