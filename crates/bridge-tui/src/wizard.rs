//! Wizard navigation: which screen is showing and what the user has picked.
//!
//! ```text
//!  Welcome ──start──▶ SourceSelect ──source──▶ ChannelSelect ──channel──▶ Config
//!     │  ╲                                                                   │
//!  settings ╲──recent──────────────────────────────────────────────────────▶ │
//!     ▼      ╲                                                          save │
//!  Settings   ╲──view running bridge──▶ BridgeControl ◀────────────────────┘
//!                                         │ back → return target
//!                                         │ stopped → Welcome
//! ```
//!
//! Every transition goes through [`WizardSession::fire`].  A trigger that is
//! not valid for the current view is rejected and changes nothing.

use bridge_proto::channel::{validate, ChannelKind, FieldMap, Source};
use bridge_proto::error::ValidationError;
use bridge_proto::store::{ConfigUpdate, PersistedConfig, SaveReceipt};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Welcome,
    SourceSelect,
    Settings,
    ChannelSelect,
    Config,
    BridgeControl,
}

impl View {
    pub fn title(self) -> &'static str {
        match self {
            View::Welcome => "Welcome",
            View::SourceSelect => "Choose Source",
            View::Settings => "Settings",
            View::ChannelSelect => "Choose Channel",
            View::Config => "Configure",
            View::BridgeControl => "Bridge",
        }
    }

    /// Position in the three-step setup flow, if any.
    pub fn step(self) -> Option<u8> {
        match self {
            View::SourceSelect => Some(1),
            View::ChannelSelect => Some(2),
            View::Config => Some(3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Start,
    OpenSettings,
    /// Resume a recently configured channel.  `stored_source` is the source
    /// tag of the last save, if any.
    SelectRecent {
        kind: ChannelKind,
        stored_source: Option<Source>,
    },
    ViewBridge {
        running: bool,
    },
    Back,
    ChooseSource(Source),
    ChooseChannel(ChannelKind),
    SaveComplete(SaveReceipt),
    StopConfirmed,
}

impl Trigger {
    pub fn name(&self) -> &'static str {
        match self {
            Trigger::Start => "start",
            Trigger::OpenSettings => "settings",
            Trigger::SelectRecent { .. } => "select recent",
            Trigger::ViewBridge { .. } => "view bridge",
            Trigger::Back => "back",
            Trigger::ChooseSource(_) => "choose source",
            Trigger::ChooseChannel(_) => "choose channel",
            Trigger::SaveComplete(_) => "save complete",
            Trigger::StopConfirmed => "stop confirmed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("'{trigger}' is not valid on the {from:?} screen")]
    NotAllowed { from: View, trigger: &'static str },
    #[error("the bridge is not running")]
    BridgeNotRunning,
}

/// Ephemeral wizard state.  Never persisted.
#[derive(Debug, Clone)]
pub struct WizardSession {
    view: View,
    return_target: View,
    source: Source,
    channel: Option<ChannelKind>,
    editing_recent: bool,
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardSession {
    pub fn new() -> Self {
        Self {
            view: View::Welcome,
            return_target: View::Welcome,
            source: Source::default(),
            channel: None,
            editing_recent: false,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// Where `Back` on the bridge screen goes.
    pub fn return_target(&self) -> View {
        self.return_target
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn channel(&self) -> Option<ChannelKind> {
        self.channel
    }

    pub fn editing_recent(&self) -> bool {
        self.editing_recent
    }

    /// Apply `trigger`.  On error the session is left exactly as it was.
    pub fn fire(&mut self, trigger: Trigger) -> Result<View, TransitionError> {
        let from = self.view;
        let rejected = TransitionError::NotAllowed {
            from,
            trigger: trigger.name(),
        };

        match (from, trigger) {
            (View::Welcome, Trigger::Start) => {
                self.editing_recent = false;
                self.view = View::SourceSelect;
            }
            (View::Welcome, Trigger::OpenSettings) => self.view = View::Settings,
            (
                View::Welcome,
                Trigger::SelectRecent {
                    kind,
                    stored_source,
                },
            ) => {
                self.channel = Some(kind);
                self.source = stored_source.unwrap_or_default();
                self.editing_recent = true;
                self.view = View::Config;
            }
            (View::Welcome, Trigger::ViewBridge { running }) => {
                if !running {
                    return Err(TransitionError::BridgeNotRunning);
                }
                self.return_target = View::Welcome;
                self.view = View::BridgeControl;
            }
            (View::SourceSelect, Trigger::Back) | (View::Settings, Trigger::Back) => {
                self.view = View::Welcome;
            }
            (View::SourceSelect, Trigger::ChooseSource(source)) => {
                self.source = source;
                self.view = View::ChannelSelect;
            }
            (View::ChannelSelect, Trigger::Back) => self.view = View::SourceSelect,
            (View::ChannelSelect, Trigger::ChooseChannel(kind)) => {
                self.channel = Some(kind);
                self.editing_recent = false;
                self.view = View::Config;
            }
            (View::Config, Trigger::Back) => self.view = View::ChannelSelect,
            (View::Config, Trigger::SaveComplete(receipt)) => {
                if self.channel != Some(receipt.kind()) {
                    return Err(rejected);
                }
                self.return_target = View::Config;
                self.view = View::BridgeControl;
            }
            (View::BridgeControl, Trigger::StopConfirmed) => {
                self.return_target = View::Welcome;
                self.view = View::Welcome;
            }
            (View::BridgeControl, Trigger::Back) => self.view = self.return_target,
            _ => return Err(rejected),
        }
        Ok(self.view)
    }
}

/// Form contents for the Config screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDraft {
    pub kind: ChannelKind,
    pub fields: FieldMap,
    pub ngrok_token: String,
}

impl ConfigDraft {
    /// Pre-populate from the stored block for `kind` and the shared token.
    /// Every schema key is present, empty when nothing is stored.
    pub fn from_persisted(kind: ChannelKind, stored: &PersistedConfig) -> Self {
        let saved = stored
            .channel_config(kind)
            .map(|c| c.to_fields())
            .unwrap_or_default();
        let fields = kind
            .fields()
            .iter()
            .map(|spec| {
                let value = saved.get(spec.key).cloned().unwrap_or_default();
                (spec.key.to_string(), value)
            })
            .collect();
        Self {
            kind,
            fields,
            ngrok_token: stored.ngrok_token.clone(),
        }
    }

    /// Run the validity gate and build the save request.
    pub fn to_update(&self, source: Source) -> Result<ConfigUpdate, ValidationError> {
        let channel = validate(self.kind, &self.fields, &self.ngrok_token)?;
        Ok(ConfigUpdate {
            channel,
            source,
            ngrok_token: self.ngrok_token.trim().to_string(),
        })
    }
}
