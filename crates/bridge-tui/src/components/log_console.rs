//! LogConsole: scrollable "Live Logs" view of the bridge output.
//!
//! Follows the newest entry while scrolled to the bottom; scrolling up
//! pins the view until End/G is pressed.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Borders, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    controller::LogEntry,
    theme::{C_ERROR, C_MUTED, C_PRIMARY, C_SECONDARY},
    widgets::pane_chrome::{pane_chrome_borders, Badge},
};

pub struct LogConsole {
    pub scroll: usize,
    follow: bool,
}

impl LogConsole {
    pub fn new() -> Self {
        Self {
            scroll: 0,
            follow: true,
        }
    }

    pub fn reset(&mut self) {
        self.scroll = 0;
        self.follow = true;
    }

    /// First visible row for `count` entries in a window of `height`.
    fn first_row(&mut self, count: usize, height: usize) -> usize {
        let max_scroll = count.saturating_sub(height);
        if self.follow || self.scroll >= max_scroll {
            self.scroll = max_scroll;
            self.follow = true;
        }
        self.scroll
    }
}

impl Default for LogConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for LogConsole {
    fn id(&self) -> ComponentId {
        ComponentId::LogConsole
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.follow = false;
                self.scroll = self.scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll += 1;
            }
            KeyCode::PageUp => {
                self.follow = false;
                self.scroll = self.scroll.saturating_sub(10);
            }
            KeyCode::PageDown => {
                self.scroll += 10;
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.follow = false;
                self.scroll = 0;
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.follow = true;
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        if area.height == 0 {
            return;
        }
        let logs = &state.bridge.state().logs;
        let count_label = entry_count(logs.len());
        let block = pane_chrome_borders(
            "Live Logs",
            false,
            Some(Badge {
                text: &count_label,
                color: C_SECONDARY,
            }),
            Borders::ALL,
        );
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if logs.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "  no log entries yet",
                    Style::default().fg(C_MUTED),
                )),
                inner,
            );
            return;
        }

        let height = inner.height as usize;
        let first = self.first_row(logs.len(), height);
        let lines: Vec<Line> = logs
            .iter()
            .skip(first)
            .take(height)
            .map(render_entry)
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

fn entry_count(n: usize) -> String {
    if n == 1 {
        "1 entry".to_string()
    } else {
        format!("{} entries", n)
    }
}

fn render_entry(entry: &LogEntry) -> Line<'static> {
    let message = strip_ansi(&entry.message);
    let fg = if message.starts_with('❌') { C_ERROR } else { C_PRIMARY };
    Line::from(vec![
        Span::styled(
            format!(" {} ", entry.received_at.format("%H:%M:%S")),
            Style::default().fg(C_MUTED),
        ),
        Span::styled(message, Style::default().fg(fg)),
    ])
}

// ── Log line formatting ───────────────────────────────────────────────────────

/// Drop CSI sequences (`ESC [ ... final`) and lone escapes.
fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\u{1b}' {
            out.push(ch);
            continue;
        }
        if chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
        } else {
            chars.next();
        }
    }
    out
}
