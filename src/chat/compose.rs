// Compose box
// Local draft only. Submitting logs the text and clears the field; nothing is
// sent anywhere and the conversation is left alone.

use crossterm::event::Event;
use log::info;
use tui_input::{backend::crossterm::EventHandler, Input};

#[derive(Debug, Default, Clone)]
pub struct Composer {
    input: Input,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn cursor(&self) -> usize {
        self.input.cursor()
    }

    /// Cursor position in terminal columns, counting wide characters twice
    pub fn visual_cursor(&self) -> usize {
        self.input.visual_cursor()
    }

    /// Columns to scroll so the cursor stays inside a box `width` wide
    pub fn visual_scroll(&self, width: usize) -> usize {
        self.input.visual_scroll(width)
    }

    pub fn set_value(&mut self, text: &str) {
        self.input = Input::new(text.to_string());
    }

    /// Feed a terminal key event into the draft
    pub fn handle_event(&mut self, event: &Event) {
        self.input.handle_event(event);
    }

    /// Take the draft out of the box.
    ///
    /// Returns the submitted text, or `None` when the draft is blank (which
    /// leaves it untouched).
    pub fn submit(&mut self) -> Option<String> {
        if self.input.value().trim().is_empty() {
            return None;
        }
        let text = self.input.value().to_string();
        info!("Compose submitted (not sent): {}", text);
        self.input.reset();
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_typing_builds_the_draft() {
        let mut composer = Composer::new();
        for c in "hey".chars() {
            composer.handle_event(&key(KeyCode::Char(c)));
        }
        composer.handle_event(&key(KeyCode::Backspace));

        assert_eq!(composer.value(), "he");
        assert_eq!(composer.cursor(), 2);
    }

    #[test]
    fn test_submit_clears_and_returns_text() {
        let mut composer = Composer::new();
        composer.set_value("see you at 5");

        assert_eq!(composer.submit(), Some("see you at 5".to_string()));
        assert_eq!(composer.value(), "");
        assert_eq!(composer.cursor(), 0);
    }

    #[test]
    fn test_visual_cursor_counts_columns() {
        let mut composer = Composer::new();
        composer.set_value("東京 ok");

        assert_eq!(composer.cursor(), 5);
        assert_eq!(composer.visual_cursor(), 7);
        assert_eq!(composer.visual_scroll(40), 0);
        assert!(composer.visual_scroll(4) > 0);
    }

    #[test]
    fn test_blank_submit_is_noop() {
        let mut composer = Composer::new();
        composer.set_value("   ");

        assert_eq!(composer.submit(), None);
        assert_eq!(composer.value(), "   ");
    }
}
