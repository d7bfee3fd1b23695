//! Component trait: the interface every wizard screen implements.
//!
//! - Components own their own UI state (selection, scroll, inputs).
//! - They read everything else from `AppState` and never mutate it.
//! - They return `Vec<Action>`; the App dispatches those.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;

pub trait Component {
    fn id(&self) -> ComponentId;

    /// Handle a key event.  Only called for the visible screen.
    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action>;

    /// Called each tick (~100ms).
    fn tick(&mut self, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    /// Called when the screen becomes visible.
    fn on_enter(&mut self, _state: &AppState) {}

    /// True while a text input has the keyboard, so single-letter global
    /// keys must not fire.
    fn captures_text(&self) -> bool {
        false
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState);
}
