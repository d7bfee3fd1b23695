//! Step 2: which messaging channel delivers the notifications.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use bridge_proto::channel::ChannelKind;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_default, style_muted, style_secondary, style_selected, C_RUNNING, C_TAG},
    widgets::pane_chrome::{draw_key_hints, wizard_chrome},
    wizard::{Trigger, View},
};

pub struct ChannelSelect {
    selected: usize,
}

impl ChannelSelect {
    pub fn new() -> Self {
        Self { selected: 0 }
    }
}

impl Default for ChannelSelect {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ChannelSelect {
    fn id(&self) -> ComponentId {
        ComponentId::ChannelSelect
    }

    fn on_enter(&mut self, state: &AppState) {
        self.selected = state
            .wizard
            .channel()
            .and_then(|kind| ChannelKind::ALL.iter().position(|k| *k == kind))
            .unwrap_or(0);
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1).min(ChannelKind::ALL.len() - 1);
                vec![]
            }
            KeyCode::Char(c @ '1'..='4') => {
                self.selected = (c as usize) - ('1' as usize);
                vec![Action::Go(Trigger::ChooseChannel(ChannelKind::ALL[self.selected]))]
            }
            KeyCode::Enter => vec![Action::Go(Trigger::ChooseChannel(
                ChannelKind::ALL[self.selected],
            ))],
            KeyCode::Esc => vec![Action::Go(Trigger::Back)],
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let view = View::ChannelSelect;
        let block = wizard_chrome(view.title(), view.step());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);

        let mut lines = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  Source: ", style_muted()),
                Span::styled(state.wizard.source().display_name(), style_secondary()),
            ]),
            Line::from(""),
        ];
        let configured = state.stored.configured_kinds();
        for (i, kind) in ChannelKind::ALL.iter().enumerate() {
            let selected = i == self.selected;
            let marker = if selected { "▸ " } else { "  " };
            let mut spans = vec![
                Span::raw(marker),
                Span::raw(format!("{}  {}", kind.icon(), kind.display_name())),
            ];
            if let Some(tag) = kind.tag() {
                spans.push(Span::styled(format!("  [{}]", tag), Style::default().fg(C_TAG)));
            }
            if configured.contains(kind) {
                spans.push(Span::styled("  ✓ configured", Style::default().fg(C_RUNNING)));
            }
            lines.push(Line::from(spans).style(if selected {
                style_selected()
            } else {
                style_default()
            }));
            lines.push(Line::from(Span::styled(
                format!("     {}", kind.description()),
                style_secondary(),
            )));
        }
        frame.render_widget(Paragraph::new(lines), rows[0]);

        draw_key_hints(
            frame,
            rows[1],
            &[("↑↓/1-4", "select"), ("Enter", "continue"), ("Esc", "back")],
        );
    }
}
