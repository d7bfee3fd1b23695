//! Settings: where things live on disk, and the update check.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use bridge_proto::update::{UpdateStatus, CURRENT_VERSION};

use crate::{
    action::{Action, ComponentId},
    app_state::{AppState, UpdateCheck},
    component::Component,
    theme::{style_muted, style_secondary, C_ERROR, C_PENDING, C_PRIMARY, C_RUNNING, C_URL},
    widgets::pane_chrome::{draw_key_hints, wizard_chrome},
    wizard::{Trigger, View},
};

pub struct SettingsScreen;

impl SettingsScreen {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SettingsScreen {
    fn default() -> Self {
        Self::new()
    }
}

fn download_url(state: &AppState) -> Option<&str> {
    match &state.update {
        UpdateCheck::Done(UpdateStatus::Available { url: Some(url), .. }) => Some(url.as_str()),
        _ => None,
    }
}

impl Component for SettingsScreen {
    fn id(&self) -> ComponentId {
        ComponentId::Settings
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Esc => vec![Action::Go(Trigger::Back)],
            KeyCode::Char('u') if state.update != UpdateCheck::Checking => {
                vec![Action::CheckUpdates]
            }
            KeyCode::Char('c') => download_url(state)
                .map(|url| vec![Action::CopyToClipboard(url.to_string())])
                .unwrap_or_default(),
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let block = wizard_chrome(View::Settings.title(), None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);

        let path_row = |label: &str, value: String| {
            Line::from(vec![
                Span::styled(format!("  {:<16}", label), style_muted()),
                Span::styled(value, Style::default().fg(C_PRIMARY)),
            ])
        };
        let paths = &state.paths;

        let mut lines = vec![
            Line::from(""),
            path_row("Version", format!("v{}", CURRENT_VERSION)),
            path_row("Settings", paths.settings_file.display().to_string()),
            path_row("Channel config", paths.store_file.display().to_string()),
            path_row("Log file", paths.log_file.display().to_string()),
            path_row("Bridge binary", paths.bridge_command.display().to_string()),
            Line::from(""),
        ];

        let update_line = match &state.update {
            UpdateCheck::Idle if !state.updates_enabled => {
                Span::styled("automatic checks disabled", style_secondary())
            }
            UpdateCheck::Idle => Span::styled("not checked yet", style_secondary()),
            UpdateCheck::Checking => {
                Span::styled("checking…", Style::default().fg(C_PENDING))
            }
            UpdateCheck::Done(UpdateStatus::UpToDate) => {
                Span::styled("up to date", Style::default().fg(C_RUNNING))
            }
            UpdateCheck::Done(UpdateStatus::Available { version, .. }) => Span::styled(
                format!("v{} available", version),
                Style::default().fg(C_PENDING),
            ),
            UpdateCheck::Failed(err) => {
                Span::styled(format!("check failed: {}", err), Style::default().fg(C_ERROR))
            }
        };
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<16}", "Updates"), style_muted()),
            update_line,
        ]));
        if let Some(url) = download_url(state) {
            lines.push(Line::from(vec![
                Span::raw(format!("  {:<16}", "")),
                Span::styled(url.to_string(), Style::default().fg(C_URL)),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), rows[0]);

        let mut hints = vec![("u", "check updates")];
        if download_url(state).is_some() {
            hints.push(("c", "copy link"));
        }
        hints.push(("Esc", "back"));
        draw_key_hints(frame, rows[1], &hints);
    }
}
