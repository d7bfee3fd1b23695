//! BridgeControl: start/stop the bridge, show its public URL and live logs.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::log_console::LogConsole,
    controller::BridgeStatus,
    theme::{style_muted, style_secondary, C_ERROR, C_MUTED, C_PENDING, C_RUNNING, C_URL},
    widgets::pane_chrome::{draw_key_hints, pane_chrome, Badge},
    wizard::{Trigger, View},
};

pub struct BridgeControl {
    console: LogConsole,
}

impl BridgeControl {
    pub fn new() -> Self {
        Self {
            console: LogConsole::new(),
        }
    }
}

impl Default for BridgeControl {
    fn default() -> Self {
        Self::new()
    }
}

fn status_color(status: BridgeStatus) -> Color {
    match status {
        BridgeStatus::NotStarted => C_MUTED,
        BridgeStatus::Starting | BridgeStatus::Stopping => C_PENDING,
        BridgeStatus::Running => C_RUNNING,
    }
}

impl Component for BridgeControl {
    fn id(&self) -> ComponentId {
        ComponentId::BridgeControl
    }

    fn on_enter(&mut self, _state: &AppState) {
        self.console.reset();
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        let status = state.bridge.status();
        match key.code {
            KeyCode::Esc => vec![Action::Go(Trigger::Back)],
            KeyCode::Char('s') | KeyCode::Enter if status == BridgeStatus::NotStarted => {
                vec![Action::StartBridge]
            }
            KeyCode::Char('x') if status == BridgeStatus::Running => vec![Action::StopBridge],
            KeyCode::Char('c') => state
                .bridge
                .state()
                .public_url
                .clone()
                .map(|url| vec![Action::CopyToClipboard(url)])
                .unwrap_or_default(),
            _ => self.console.handle_key(key, state),
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let runtime = state.bridge.state();
        let status = runtime.status;

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        let block = pane_chrome(
            View::BridgeControl.title(),
            true,
            Some(Badge {
                text: status.label(),
                color: status_color(status),
            }),
        );
        let inner = block.inner(rows[0]);
        frame.render_widget(block, rows[0]);

        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = match status {
            BridgeStatus::NotStarted => vec![
                Line::from(Span::styled(" Ready to Start", bold)),
                Line::from(Span::styled(
                    " Press s to start the bridge and begin receiving notifications.",
                    style_secondary(),
                )),
            ],
            BridgeStatus::Starting => vec![
                Line::from(Span::styled(" Starting…", bold.fg(C_PENDING))),
                Line::from(Span::styled(
                    " Launching the bridge and opening the tunnel.",
                    style_secondary(),
                )),
            ],
            BridgeStatus::Running => vec![Line::from(Span::styled(
                " 🚀 Bridge Running",
                bold.fg(C_RUNNING),
            ))],
            BridgeStatus::Stopping => vec![Line::from(Span::styled(
                " Stopping...",
                bold.fg(C_PENDING),
            ))],
        };
        if status == BridgeStatus::Running || status == BridgeStatus::Stopping {
            let url = match &runtime.public_url {
                Some(url) => Span::styled(url.clone(), Style::default().fg(C_URL)),
                None => Span::styled("waiting for tunnel…", style_muted()),
            };
            lines.push(Line::from(vec![Span::styled(" Public URL  ", style_muted()), url]));
        }
        if status == BridgeStatus::NotStarted {
            if let Some(last) = runtime.logs.last().filter(|e| e.message.starts_with('❌')) {
                lines.push(Line::from(Span::styled(
                    format!(" {}", last.message),
                    Style::default().fg(C_ERROR),
                )));
            }
        }
        frame.render_widget(Paragraph::new(lines), inner);

        self.console.draw(frame, rows[1], state);

        let mut hints: Vec<(&str, &str)> = Vec::new();
        match status {
            BridgeStatus::NotStarted => hints.push(("s", "start")),
            BridgeStatus::Running => hints.push(("x", "stop")),
            _ => {}
        }
        if runtime.public_url.is_some() {
            hints.push(("c", "copy URL"));
        }
        hints.push(("↑↓", "scroll"));
        hints.push(match state.wizard.return_target() {
            View::Config => ("Esc", "edit config"),
            _ => ("Esc", "back"),
        });
        draw_key_hints(frame, rows[2], &hints);
    }
}
