//! Step 1: where notifications come from.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use bridge_proto::channel::Source;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_default, style_secondary, style_selected},
    widgets::pane_chrome::{draw_key_hints, wizard_chrome},
    wizard::{Trigger, View},
};

pub struct SourceSelect {
    selected: usize,
}

impl SourceSelect {
    pub fn new() -> Self {
        Self { selected: 0 }
    }
}

impl Default for SourceSelect {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for SourceSelect {
    fn id(&self) -> ComponentId {
        ComponentId::SourceSelect
    }

    fn on_enter(&mut self, state: &AppState) {
        self.selected = Source::ALL
            .iter()
            .position(|s| *s == state.wizard.source())
            .unwrap_or(0);
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1).min(Source::ALL.len() - 1);
                vec![]
            }
            KeyCode::Enter => vec![Action::Go(Trigger::ChooseSource(Source::ALL[self.selected]))],
            KeyCode::Esc => vec![Action::Go(Trigger::Back)],
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _state: &AppState) {
        let view = View::SourceSelect;
        let block = wizard_chrome(view.title(), view.step());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);

        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Where should notifications come from?",
                style_secondary(),
            )),
            Line::from(""),
        ];
        for (i, source) in Source::ALL.iter().enumerate() {
            let selected = i == self.selected;
            let marker = if selected { "▸ " } else { "  " };
            let title = Line::from(vec![Span::raw(marker), Span::raw(source.display_name())]);
            lines.push(title.style(if selected {
                style_selected()
            } else {
                style_default()
            }));
            lines.push(Line::from(Span::styled(
                format!("    {}", source.description()),
                style_secondary(),
            )));
            lines.push(Line::from(""));
        }
        frame.render_widget(Paragraph::new(lines), rows[0]);

        draw_key_hints(
            frame,
            rows[1],
            &[("↑↓", "select"), ("Enter", "continue"), ("Esc", "back")],
        );
    }
}
