//! PaneChrome: bordered pane with focus styling, badges and step markers.

use crate::theme::{
    style_focused_border, style_key_hint, style_unfocused_border, C_MUTED, C_PRIMARY, C_SECONDARY,
};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// A badge shown in the top-right of the pane header (e.g. "RUNNING").
pub struct Badge<'a> {
    pub text: &'a str,
    pub color: Color,
}

/// Renders a bordered pane with consistent focus styling and optional badge.
pub fn pane_chrome<'a>(title: &'a str, focused: bool, badge: Option<Badge<'a>>) -> Block<'a> {
    pane_chrome_borders(title, focused, badge, Borders::ALL)
}

/// Wizard screen frame: `title` on the left, "Step n of 3" when `step` is set.
pub fn wizard_chrome<'a>(title: &'a str, step: Option<u8>) -> Block<'a> {
    let block = pane_chrome_borders(title, true, None, Borders::ALL);
    match step {
        Some(n) => block.title_top(
            Line::from(Span::styled(
                format!(" Step {} of 3 ", n),
                Style::default().fg(C_SECONDARY),
            ))
            .right_aligned(),
        ),
        None => block,
    }
}

/// Like `pane_chrome` but with explicit border selection.
pub fn pane_chrome_borders<'a>(
    title: &'a str,
    focused: bool,
    badge: Option<Badge<'a>>,
    borders: Borders,
) -> Block<'a> {
    let border_style = if focused {
        style_focused_border()
    } else {
        style_unfocused_border()
    };

    let title_style = if focused {
        Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(C_MUTED)
    };

    let block = Block::default()
        .borders(borders)
        .border_style(border_style)
        .title(Line::from(Span::styled(format!(" {} ", title), title_style)));

    if let Some(b) = badge {
        block.title_top(
            Line::from(Span::styled(
                format!(" {} ", b.text),
                Style::default().fg(b.color).add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
        )
    } else {
        block
    }
}

/// One-row key legend: `[("Enter", "select"), ("Esc", "back")]`.
pub fn draw_key_hints(frame: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    if area.height == 0 {
        return;
    }
    let mut spans = vec![Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(
            *key,
            Style::default().fg(C_SECONDARY).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!(" {}  ", label), style_key_hint()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
