//! TextField: wraps tui-input for the credential form, with optional masking.

use ratatui::crossterm::event::{Event, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{style_input, C_INPUT_BG, C_MUTED, C_PRIMARY};

const MASK: char = '•';

pub struct TextField {
    input: Input,
    placeholder: String,
    masked: bool,
}

impl TextField {
    pub fn new(placeholder: impl Into<String>, masked: bool) -> Self {
        Self {
            input: Input::default(),
            placeholder: placeholder.into(),
            masked,
        }
    }

    pub fn set_value(&mut self, value: &str) {
        self.input = Input::new(value.to_string());
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    /// Feed an editing key (chars, Backspace, arrows, Home/End...).
    pub fn handle_key(&mut self, key: KeyEvent) {
        self.input.handle_event(&Event::Key(key));
    }

    /// What the user sees: the value, or one mask glyph per char.
    pub fn display_value(&self) -> String {
        if self.masked {
            std::iter::repeat(MASK)
                .take(self.input.value().chars().count())
                .collect()
        } else {
            self.input.value().to_string()
        }
    }

    /// Render into a single row.  The cursor is placed only when `focused`.
    pub fn draw(&self, frame: &mut Frame, area: Rect, focused: bool) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let width = area.width.saturating_sub(2) as usize;
        let scroll = self.input.visual_scroll(width);
        let span = if self.input.value().is_empty() {
            Span::styled(format!(" {}", self.placeholder), Style::default().fg(C_MUTED))
        } else {
            let shown: String = self.display_value().chars().skip(scroll).collect();
            let fg = if focused { style_input() } else { Style::default().fg(C_PRIMARY) };
            Span::styled(format!(" {}", shown), fg)
        };
        frame.render_widget(
            Paragraph::new(Line::from(span)).style(Style::default().bg(C_INPUT_BG)),
            area,
        );

        if focused {
            let offset = self.input.visual_cursor().saturating_sub(scroll) as u16;
            let cursor_x = (area.x + 1 + offset).min(area.x + area.width - 1);
            frame.set_cursor_position((cursor_x, area.y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn test_masked_display_hides_value() {
        let mut field = TextField::new("token", true);
        field.set_value("s3cret");
        assert_eq!(field.value(), "s3cret");
        assert_eq!(field.display_value(), "••••••");
    }

    #[test]
    fn test_typing_appends() {
        let mut field = TextField::new("chat id", false);
        for c in "42".chars() {
            field.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        field.handle_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(field.value(), "4");
        assert_eq!(field.display_value(), "4");
    }
}
