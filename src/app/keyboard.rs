use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};

use super::{App, OverlayState};
use crate::definitions::FocusArea;

/// Lines moved per transcript scroll step.
const SCROLL_STEP: usize = 1;
/// Lines moved per page scroll.
const PAGE_STEP: usize = 10;

impl App {
    /// The main entry point for handling keyboard events.
    ///
    /// Routes the key to the overlay if one is open, then to global
    /// shortcuts, then to the focused pane.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        // Overlays capture all input.
        if self.overlay.is_some() {
            self.handle_overlay_key(key);
            return;
        }

        if self.handle_global_shortcuts(key) {
            return;
        }

        match self.focus {
            FocusArea::Composer => self.handle_composer_key(key),
            FocusArea::Transcript => self.handle_transcript_key(key),
        }
    }

    /// Handles global keyboard shortcuts.
    /// Returns `true` if a shortcut was handled.
    fn handle_global_shortcuts(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    true
                }
                KeyCode::Char('l') => {
                    self.reset_session();
                    true
                }
                KeyCode::Char('o') => {
                    self.open_document_picker();
                    true
                }
                _ => false,
            }
        } else if key.code == KeyCode::Tab {
            self.focus = self.focus.toggled();
            self.status_message = format!("Focus: {}", self.focus.label());
            true
        } else {
            false
        }
    }

    fn handle_composer_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::ALT) {
                    self.composer.insert_newline();
                } else {
                    self.submit_prompt();
                }
            }
            KeyCode::Backspace => self.composer.backspace(),
            KeyCode::Delete => self.composer.delete(),
            KeyCode::Left => self.composer.move_left(),
            KeyCode::Right => self.composer.move_right(),
            KeyCode::Home => self.composer.move_to_start(),
            KeyCode::End => self.composer.move_to_end(),
            KeyCode::Up => {
                self.composer.history_previous();
            }
            KeyCode::Down => {
                self.composer.history_next();
            }
            KeyCode::Char(ch) => self.composer.insert_char(ch),
            _ => {}
        }
    }

    fn handle_transcript_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.transcript.scroll_up(SCROLL_STEP),
            KeyCode::Down => self.transcript.scroll_down(SCROLL_STEP),
            KeyCode::PageUp => self.transcript.scroll_up(PAGE_STEP),
            KeyCode::PageDown => self.transcript.scroll_down(PAGE_STEP),
            KeyCode::End => self.transcript.follow(),
            _ => {}
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) {
        let Some(OverlayState::DocumentPicker(picker)) = self.overlay.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Up => picker.move_selection(-1),
            KeyCode::Down => picker.move_selection(1),
            KeyCode::Enter => {
                let selected = picker.selected_path().cloned();
                self.overlay = None;
                if let Some(path) = selected {
                    self.ingest_document(path);
                }
            }
            KeyCode::Esc => {
                self.overlay = None;
                self.status_message = String::from("Attach cancelled.");
            }
            _ => {}
        }
    }

    /// Mouse wheel scrolls the transcript regardless of focus.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.transcript.scroll_up(3),
            MouseEventKind::ScrollDown => self.transcript.scroll_down(3),
            _ => {}
        }
    }
}
