//! Defines the core state structures for the application.
//!
//! This module contains the central `App` struct that holds the entire state
//! of the TUI session: the conversation store, the document context, the
//! exchange controller, the input composer and the overlay state.

use std::path::PathBuf;

use crate::chat::context::DocumentContext;
use crate::chat::document::TextExtractor;
use crate::chat::exchange::ExchangeController;
use crate::chat::store::ConversationStore;
use crate::definitions::FocusArea;
use crate::panels::transcript::TranscriptPanel;

/// The main application state.
///
/// Single source of truth for rendering and input handling. The conversation
/// store and the document context live here and are only ever mutated from
/// the UI task.
pub struct App {
    /// Flag to indicate if the application should quit.
    pub should_quit: bool,
    /// The currently focused UI area.
    pub focus: FocusArea,
    /// The ordered transcript and its persistence boundary.
    pub conversation: ConversationStore,
    /// Text extracted from the most recently attached document, if any.
    pub document: DocumentContext,
    /// State machine for the at-most-one in-flight exchange.
    pub exchange: ExchangeController,
    /// Scroll state of the transcript panel.
    pub transcript: TranscriptPanel,
    /// The message input box.
    pub composer: Composer,
    /// The message currently displayed in the status bar.
    pub status_message: String,
    /// The root directory the client was started in.
    pub workspace_root: PathBuf,
    /// The currently active overlay, if any.
    pub overlay: Option<OverlayState>,
    /// Display name of the assistant, from settings.
    pub assistant_name: String,
    /// Model identifier, for the header and status lines.
    pub model_name: String,
    /// Extraction collaborator for attached documents.
    pub(crate) extractor: Box<dyn TextExtractor>,
}

/// Pop-up surfaces that capture all input while open.
pub enum OverlayState {
    DocumentPicker(DocumentPickerState),
}

/// State for the document picker overlay.
pub struct DocumentPickerState {
    /// Candidate files under the workspace root.
    pub entries: Vec<PathBuf>,
    /// The index of the currently selected entry.
    pub selected: usize,
}

impl DocumentPickerState {
    pub fn new(entries: Vec<PathBuf>) -> Self {
        Self {
            entries,
            selected: 0,
        }
    }

    /// Moves the selection up or down, clamped to the list bounds.
    pub fn move_selection(&mut self, delta: isize) {
        if self.entries.is_empty() {
            self.selected = 0;
            return;
        }
        let len = self.entries.len() as isize;
        let next = (self.selected as isize + delta).clamp(0, len - 1);
        self.selected = next as usize;
    }

    pub fn selected_path(&self) -> Option<&PathBuf> {
        self.entries.get(self.selected)
    }
}

/// State for the message input composer.
///
/// Manages the text buffer, the byte-indexed cursor and the prompt history.
#[derive(Clone, Default)]
pub struct Composer {
    buffer: String,
    cursor: usize,
    history: Vec<String>,
    history_index: Option<usize>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Inserts a character at the current cursor position.
    pub fn insert_char(&mut self, ch: char) {
        self.buffer.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        self.reset_history_navigation();
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    /// Deletes the character before the cursor (backspace).
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        if let Some((idx, _)) = self.buffer[..self.cursor].char_indices().next_back() {
            self.buffer.drain(idx..self.cursor);
            self.cursor = idx;
            self.reset_history_navigation();
        }
    }

    /// Deletes the character at the cursor (delete).
    pub fn delete(&mut self) {
        if self.cursor >= self.buffer.len() {
            return;
        }
        if let Some((_, ch)) = self.buffer[self.cursor..].char_indices().next() {
            let end = self.cursor + ch.len_utf8();
            self.buffer.drain(self.cursor..end);
            self.reset_history_navigation();
        }
    }

    pub fn move_left(&mut self) {
        if let Some((idx, _)) = self.buffer[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    pub fn move_right(&mut self) {
        if let Some((offset, ch)) = self.buffer[self.cursor..].char_indices().next() {
            self.cursor += offset + ch.len_utf8();
        }
    }

    pub fn move_to_start(&mut self) {
        self.cursor = 0;
    }

    pub fn move_to_end(&mut self) {
        self.cursor = self.buffer.len();
    }

    /// Takes the content of the buffer, adds it to history, and clears the
    /// buffer.
    pub fn take(&mut self) -> String {
        let content = std::mem::take(&mut self.buffer);
        if !content.trim().is_empty() {
            self.history.push(content.clone());
        }
        self.cursor = 0;
        self.reset_history_navigation();
        content
    }

    /// Navigates to the previous entry in the prompt history.
    pub fn history_previous(&mut self) -> bool {
        if self.history.is_empty() {
            return false;
        }
        let target = match self.history_index {
            Some(idx) => idx.saturating_sub(1),
            None => self.history.len() - 1,
        };
        self.load_history(target)
    }

    /// Navigates to the next entry, or back to an empty buffer past the end.
    pub fn history_next(&mut self) -> bool {
        if self.history.is_empty() {
            return false;
        }
        match self.history_index {
            Some(idx) if idx + 1 < self.history.len() => self.load_history(idx + 1),
            Some(_) => {
                self.history_index = None;
                self.buffer.clear();
                self.cursor = 0;
                true
            }
            None => false,
        }
    }

    fn load_history(&mut self, index: usize) -> bool {
        if let Some(entry) = self.history.get(index).cloned() {
            self.buffer = entry;
            self.cursor = self.buffer.len();
            self.history_index = Some(index);
            true
        } else {
            false
        }
    }

    fn reset_history_navigation(&mut self) {
        self.history_index = None;
    }

    /// Calculates the (col, row) display position of the cursor for a given
    /// wrap width.
    pub fn cursor_display_position(&self, width: usize) -> (u16, u16) {
        if width == 0 {
            return (0, 0);
        }
        let mut col = 0usize;
        let mut row = 0usize;
        for ch in self.buffer[..self.cursor].chars() {
            if ch == '\n' {
                row += 1;
                col = 0;
                continue;
            }
            let char_width = unicode_width::UnicodeWidthChar::width(ch)
                .unwrap_or(1)
                .max(1);
            if col + char_width > width {
                row += 1;
                col = 0;
            }
            col += char_width;
            if col >= width {
                row += 1;
                col = 0;
            }
        }
        (col as u16, row as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_is_cursor_safe_on_multibyte_input() {
        let mut composer = Composer::new();
        for ch in "a宇b".chars() {
            composer.insert_char(ch);
        }
        composer.move_left();
        composer.backspace();
        assert_eq!(composer.buffer(), "ab");

        composer.move_to_start();
        composer.delete();
        assert_eq!(composer.buffer(), "b");
    }

    #[test]
    fn take_records_history_and_clears() {
        let mut composer = Composer::new();
        for ch in "first".chars() {
            composer.insert_char(ch);
        }
        assert_eq!(composer.take(), "first");
        assert!(composer.is_empty());

        for ch in "second".chars() {
            composer.insert_char(ch);
        }
        let _ = composer.take();

        assert!(composer.history_previous());
        assert_eq!(composer.buffer(), "second");
        assert!(composer.history_previous());
        assert_eq!(composer.buffer(), "first");
        assert!(composer.history_next());
        assert_eq!(composer.buffer(), "second");
        assert!(composer.history_next());
        assert!(composer.is_empty());
    }

    #[test]
    fn blank_input_is_not_recorded_in_history() {
        let mut composer = Composer::new();
        composer.insert_char(' ');
        assert_eq!(composer.take(), " ");
        assert!(!composer.history_previous());
    }

    #[test]
    fn picker_selection_is_clamped() {
        let mut picker = DocumentPickerState::new(vec![
            PathBuf::from("a.txt"),
            PathBuf::from("b.txt"),
        ]);
        picker.move_selection(-3);
        assert_eq!(picker.selected, 0);
        picker.move_selection(5);
        assert_eq!(picker.selected, 1);
        assert_eq!(picker.selected_path(), Some(&PathBuf::from("b.txt")));
    }
}
