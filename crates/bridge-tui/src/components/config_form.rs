//! Step 3: credential form for the selected channel plus the ngrok token.
//!
//! Field values are loaded from the store on entry.  Submitting runs the
//! validity gate locally; only a valid draft becomes a `SaveConfig`.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use bridge_proto::channel::{ChannelKind, FieldMap, FieldSpec, Source};
use bridge_proto::store::{ConfigUpdate, PersistedConfig};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_muted, style_secondary, C_ERROR, C_PENDING, C_PRIMARY},
    widgets::pane_chrome::{draw_key_hints, wizard_chrome},
    widgets::text_field::TextField,
    wizard::{ConfigDraft, Trigger, View},
};

const NGROK_LABEL: &str = "ngrok Auth Token";
const NGROK_PLACEHOLDER: &str = "2abc...";
const NGROK_HINT: &str = "Free at dashboard.ngrok.com";

struct FormField {
    label: &'static str,
    hint: Option<&'static str>,
    /// Schema key; `None` for the ngrok token.
    key: Option<&'static str>,
    input: TextField,
}

impl FormField {
    fn from_spec(spec: &FieldSpec, value: &str) -> Self {
        let mut input = TextField::new(spec.placeholder, spec.secret);
        input.set_value(value);
        Self {
            label: spec.label,
            hint: spec.hint,
            key: Some(spec.key),
            input,
        }
    }
}

pub struct ConfigForm {
    kind: Option<ChannelKind>,
    fields: Vec<FormField>,
    focus: usize,
    error: Option<String>,
}

impl ConfigForm {
    pub fn new() -> Self {
        Self {
            kind: None,
            fields: Vec::new(),
            focus: 0,
            error: None,
        }
    }

    /// Rebuild the inputs for `kind` from what is stored.
    pub fn load(&mut self, kind: ChannelKind, stored: &PersistedConfig) {
        let draft = ConfigDraft::from_persisted(kind, stored);
        let mut token = TextField::new(NGROK_PLACEHOLDER, true);
        token.set_value(&draft.ngrok_token);

        self.fields = kind
            .fields()
            .iter()
            .map(|spec| {
                let value = draft.fields.get(spec.key).map(String::as_str).unwrap_or("");
                FormField::from_spec(spec, value)
            })
            .collect();
        self.fields.push(FormField {
            label: NGROK_LABEL,
            hint: Some(NGROK_HINT),
            key: None,
            input: token,
        });
        self.kind = Some(kind);
        self.focus = 0;
        self.error = None;
    }

    pub(crate) fn draft(&self) -> Option<ConfigDraft> {
        let kind = self.kind?;
        let mut fields = FieldMap::new();
        let mut ngrok_token = String::new();
        for f in &self.fields {
            match f.key {
                Some(key) => {
                    fields.insert(key.to_string(), f.input.value().to_string());
                }
                None => ngrok_token = f.input.value().to_string(),
            }
        }
        Some(ConfigDraft {
            kind,
            fields,
            ngrok_token,
        })
    }

    /// Validate the current inputs.  On failure the message is kept for
    /// display and nothing is returned.
    pub fn submit(&mut self, source: Source) -> Option<ConfigUpdate> {
        let draft = self.draft()?;
        match draft.to_update(source) {
            Ok(update) => {
                self.error = None;
                Some(update)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                None
            }
        }
    }

    fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    fn save_actions(&mut self, state: &AppState) -> Vec<Action> {
        if state.saving {
            return vec![];
        }
        self.submit(state.wizard.source())
            .map(|update| vec![Action::SaveConfig(update)])
            .unwrap_or_default()
    }
}

impl Default for ConfigForm {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ConfigForm {
    fn id(&self) -> ComponentId {
        ComponentId::ConfigForm
    }

    fn on_enter(&mut self, state: &AppState) {
        match state.wizard.channel() {
            Some(kind) => self.load(kind, &state.stored),
            None => {
                self.kind = None;
                self.fields.clear();
            }
        }
    }

    fn captures_text(&self) -> bool {
        true
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => vec![Action::Go(Trigger::Back)],
            KeyCode::Char('s') if ctrl => self.save_actions(state),
            KeyCode::Tab | KeyCode::Down => {
                self.focus_next();
                vec![]
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus_prev();
                vec![]
            }
            KeyCode::Enter => {
                if self.focus + 1 >= self.fields.len() {
                    self.save_actions(state)
                } else {
                    self.focus_next();
                    vec![]
                }
            }
            _ => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    field.input.handle_key(key);
                }
                vec![]
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let kind_name = self.kind.map(|k| k.display_name()).unwrap_or("channel");
        let title = if state.wizard.editing_recent() {
            format!("Edit {}", kind_name)
        } else {
            format!("{} {}", View::Config.title(), kind_name)
        };
        let block = wizard_chrome(&title, View::Config.step());
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height < 2 || inner.width < 4 {
            return;
        }

        let bottom = inner.y + inner.height;
        let mut y = inner.y + 1;
        let x = inner.x + 2;
        let width = inner.width.saturating_sub(4);

        if let Some(kind) = self.kind {
            if y < bottom {
                let header = Line::from(vec![
                    Span::raw(format!("{} ", kind.icon())),
                    Span::styled(kind.description(), style_secondary()),
                ]);
                frame.render_widget(Paragraph::new(header), Rect::new(x, y, width, 1));
            }
            y += 2;
        }

        for (i, field) in self.fields.iter().enumerate() {
            if y + 1 >= bottom {
                break;
            }
            let focused = i == self.focus;
            let label_style = if focused {
                Style::default().fg(C_PRIMARY)
            } else {
                style_secondary()
            };
            frame.render_widget(
                Paragraph::new(Span::styled(field.label, label_style)),
                Rect::new(x, y, width, 1),
            );
            field.input.draw(frame, Rect::new(x, y + 1, width, 1), focused);
            y += 2;
            if let Some(hint) = field.hint {
                if y < bottom {
                    frame.render_widget(
                        Paragraph::new(Span::styled(hint, style_muted())),
                        Rect::new(x, y, width, 1),
                    );
                }
                y += 1;
            }
            y += 1;
        }

        let status = if state.saving {
            Some(Span::styled("Saving…", Style::default().fg(C_PENDING)))
        } else if let Some(err) = self.error.as_ref().or(state.save_error.as_ref()) {
            Some(Span::styled(format!("✗ {}", err), Style::default().fg(C_ERROR)))
        } else {
            None
        };
        if let Some(span) = status {
            if y < bottom.saturating_sub(1) {
                frame.render_widget(Paragraph::new(span), Rect::new(x, y, width, 1));
            }
        }

        draw_key_hints(
            frame,
            Rect::new(inner.x, bottom - 1, inner.width, 1),
            &[
                ("Tab/↑↓", "field"),
                ("Enter", "next/save"),
                ("Ctrl+S", "save & continue"),
                ("Esc", "back"),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_proto::channel::{ChannelConfig, TelegramConfig};

    fn type_into(form: &mut ConfigForm, text: &str) {
        for c in text.chars() {
            let key = KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
            if let Some(field) = form.fields.get_mut(form.focus) {
                field.input.handle_key(key);
            }
        }
    }

    #[test]
    fn test_load_prefills_from_store() {
        let mut stored = PersistedConfig::default();
        stored.ngrok_token = "tok".into();
        stored.set_channel_config(ChannelConfig::Telegram(TelegramConfig {
            bot_token: "123:abc".into(),
            chat_id: "42".into(),
        }));

        let mut form = ConfigForm::new();
        form.load(ChannelKind::Telegram, &stored);
        assert_eq!(form.fields.len(), 3);
        assert_eq!(form.fields[0].input.value(), "123:abc");
        assert_eq!(form.fields[0].input.display_value(), "•••••••");
        assert_eq!(form.fields[1].input.value(), "42");
        assert_eq!(form.fields[2].input.value(), "tok");
        assert_eq!(form.fields[2].label, NGROK_LABEL);

        let update = form.submit(Source::Mcp).expect("valid draft");
        assert_eq!(update.source, Source::Mcp);
        assert_eq!(update.ngrok_token, "tok");
        assert_eq!(update.channel.kind(), ChannelKind::Telegram);
    }

    #[test]
    fn test_submit_reports_missing_field() {
        let mut form = ConfigForm::new();
        form.load(ChannelKind::WhatsApp, &PersistedConfig::default());
        type_into(&mut form, "k");
        form.focus_prev();
        type_into(&mut form, "tok");

        assert!(form.submit(Source::Agent).is_none());
        let err = form.error.clone().expect("error shown");
        assert!(err.contains("Your Phone Number"), "got {}", err);

        form.focus_prev();
        type_into(&mut form, "+15550100");
        assert!(form.submit(Source::Agent).is_some());
        assert!(form.error.is_none());
    }

    #[test]
    fn test_focus_wraps() {
        let mut form = ConfigForm::new();
        form.load(ChannelKind::Sms, &PersistedConfig::default());
        assert_eq!(form.fields.len(), 5);
        form.focus_prev();
        assert_eq!(form.focus, 4);
        form.focus_next();
        assert_eq!(form.focus, 0);
    }
}
