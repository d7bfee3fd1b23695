//! Welcome screen: start setup, resume a recent channel, open settings, or
//! jump back to a running bridge.

use chrono::Utc;
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use bridge_proto::recents::relative_age;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_accent, style_muted, style_secondary, style_selected, C_RUNNING},
    widgets::pane_chrome::{draw_key_hints, wizard_chrome},
    wizard::Trigger,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Start,
    Recent(usize),
    ViewBridge,
}

pub struct WelcomeScreen {
    selected: usize,
}

impl WelcomeScreen {
    pub fn new() -> Self {
        Self { selected: 0 }
    }

    fn entries(state: &AppState) -> Vec<Entry> {
        let mut entries = Vec::new();
        if state.bridge_viewable() {
            entries.push(Entry::ViewBridge);
        }
        entries.push(Entry::Start);
        entries.extend((0..state.recents.len()).map(Entry::Recent));
        entries
    }

    fn activate(entry: Entry, state: &AppState) -> Vec<Action> {
        match entry {
            Entry::Start => vec![Action::Go(Trigger::Start)],
            Entry::ViewBridge => vec![Action::Go(Trigger::ViewBridge {
                running: state.bridge_viewable(),
            })],
            Entry::Recent(idx) => recent_action(idx, state),
        }
    }
}

fn recent_action(idx: usize, state: &AppState) -> Vec<Action> {
    state
        .recents
        .get(idx)
        .and_then(|entry| entry.kind())
        .map(|kind| {
            vec![Action::Go(Trigger::SelectRecent {
                kind,
                stored_source: state.stored.source,
            })]
        })
        .unwrap_or_default()
}

impl Default for WelcomeScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for WelcomeScreen {
    fn id(&self) -> ComponentId {
        ComponentId::Welcome
    }

    fn on_enter(&mut self, _state: &AppState) {
        self.selected = 0;
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        let entries = Self::entries(state);
        self.selected = self.selected.min(entries.len().saturating_sub(1));
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < entries.len() {
                    self.selected += 1;
                }
                vec![]
            }
            KeyCode::Enter => entries
                .get(self.selected)
                .map(|e| Self::activate(*e, state))
                .unwrap_or_default(),
            KeyCode::Char('s') => vec![Action::Go(Trigger::Start)],
            KeyCode::Char(',') | KeyCode::Char('o') => vec![Action::Go(Trigger::OpenSettings)],
            KeyCode::Char('b') if state.bridge_viewable() => {
                vec![Action::Go(Trigger::ViewBridge { running: true })]
            }
            KeyCode::Char(c @ '1'..='9') => {
                let idx = (c as usize) - ('1' as usize);
                recent_action(idx, state)
            }
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let block = wizard_chrome("Remote Bridge", None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(inner);

        let banner = vec![
            Line::from(""),
            Line::from(Span::styled("⚡ Remote Bridge", style_accent())),
            Line::from(Span::styled("Your Agent, Unchained.", style_secondary())),
        ];
        frame.render_widget(
            Paragraph::new(banner).alignment(Alignment::Center),
            rows[0],
        );

        let entries = Self::entries(state);
        self.selected = self.selected.min(entries.len().saturating_sub(1));
        let now = Utc::now();
        let mut lines = Vec::new();
        let mut recents_header_done = false;
        for (i, entry) in entries.iter().enumerate() {
            let marker = if i == self.selected { "▸ " } else { "  " };
            let line = match entry {
                Entry::ViewBridge => Line::from(vec![
                    Span::raw(marker),
                    Span::styled("● ", Style::default().fg(C_RUNNING)),
                    Span::raw("View running bridge"),
                ]),
                Entry::Start => Line::from(vec![
                    Span::raw(marker),
                    Span::styled("Start setup", Style::default().add_modifier(Modifier::BOLD)),
                ]),
                Entry::Recent(idx) => {
                    if !recents_header_done {
                        recents_header_done = true;
                        lines.push(Line::from(""));
                        lines.push(Line::from(Span::styled("  Recent channels", style_muted())));
                    }
                    match state.recents.get(*idx) {
                        Some(recent) => Line::from(vec![
                            Span::raw(marker),
                            Span::styled(format!("{}  ", idx + 1), style_muted()),
                            Span::raw(format!("{} {}", recent.icon, recent.name)),
                            Span::styled(
                                format!("  {}", relative_age(recent, now)),
                                style_secondary(),
                            ),
                        ]),
                        None => continue,
                    }
                }
            };
            let line = if i == self.selected {
                line.style(style_selected())
            } else {
                line
            };
            lines.push(line);
        }
        frame.render_widget(Paragraph::new(lines), rows[1]);

        let mut hints = vec![("↑↓", "select"), ("Enter", "open"), ("s", "start")];
        if !state.recents.is_empty() {
            hints.push(("1-9", "recent"));
        }
        if state.bridge_viewable() {
            hints.push(("b", "bridge"));
        }
        hints.push((",", "settings"));
        hints.push(("q", "quit"));
        draw_key_hints(frame, rows[2], &hints);
    }
}
