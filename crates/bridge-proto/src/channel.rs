//! Notification channels, their credential schemas and the validity gate.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Raw form values keyed by schema field key (`bot_token`, `chat_id`, ...).
pub type FieldMap = BTreeMap<String, String>;

/// Where the agent requests come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Agent,
    Mcp,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Agent, Source::Mcp];

    pub fn key(self) -> &'static str {
        match self {
            Source::Agent => "agent",
            Source::Mcp => "mcp",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Source::Agent => "AI Agent",
            Source::Mcp => "MCP Server",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Source::Agent => "VS Code Copilot, Cursor, Windsurf",
            Source::Mcp => "Claude Desktop, Custom Tools",
        }
    }
}

/// One credential field of a channel's schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub hint: Option<&'static str>,
    /// Rendered masked in the form.
    pub secret: bool,
}

const fn field(
    key: &'static str,
    label: &'static str,
    placeholder: &'static str,
    hint: Option<&'static str>,
    secret: bool,
) -> FieldSpec {
    FieldSpec {
        key,
        label,
        placeholder,
        hint,
        secret,
    }
}

const TELEGRAM_FIELDS: &[FieldSpec] = &[
    field(
        "bot_token",
        "Bot Token",
        "123456:ABC-DEF1234ghIkl-zyx57W2v",
        Some("Get this from @BotFather on Telegram"),
        true,
    ),
    field(
        "chat_id",
        "Chat ID",
        "123456789",
        Some("Your Telegram user/group ID"),
        false,
    ),
];

const WHATSAPP_FIELDS: &[FieldSpec] = &[
    field(
        "api_key",
        "CallMeBot API Key",
        "123456",
        Some("Get this from callmebot.com"),
        true,
    ),
    field(
        "phone",
        "Your Phone Number",
        "+1234567890",
        Some("Include country code"),
        false,
    ),
];

const GMAIL_FIELDS: &[FieldSpec] = &[
    field("email", "Your Gmail Address", "you@gmail.com", None, false),
    field(
        "app_password",
        "App Password",
        "••••••••••••",
        Some("Generate in Google Account settings"),
        true,
    ),
];

const SMS_FIELDS: &[FieldSpec] = &[
    field(
        "twilio_sid",
        "Twilio Account SID",
        "ACxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
        None,
        false,
    ),
    field("twilio_token", "Auth Token", "••••••••••••", None, true),
    field(
        "from",
        "Twilio Phone Number",
        "+1234567890",
        Some("Your Twilio number"),
        false,
    ),
    field(
        "to",
        "Your Phone Number",
        "+1234567890",
        Some("Where to send SMS"),
        false,
    ),
];

/// A notification channel kind.  The serde name doubles as the persisted
/// block key and the recents `config_key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Telegram,
    WhatsApp,
    Gmail,
    Sms,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Telegram,
        ChannelKind::WhatsApp,
        ChannelKind::Gmail,
        ChannelKind::Sms,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ChannelKind::Telegram => "telegram",
            ChannelKind::WhatsApp => "whatsapp",
            ChannelKind::Gmail => "gmail",
            ChannelKind::Sms => "sms",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ChannelKind::Telegram => "Telegram",
            ChannelKind::WhatsApp => "WhatsApp",
            ChannelKind::Gmail => "Gmail",
            ChannelKind::Sms => "SMS",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            ChannelKind::Telegram => "✈",
            ChannelKind::WhatsApp => "☎",
            ChannelKind::Gmail => "✉",
            ChannelKind::Sms => "✆",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ChannelKind::Telegram => "Instant bot notifications",
            ChannelKind::WhatsApp => "Via CallMeBot API",
            ChannelKind::Gmail => "Email notifications",
            ChannelKind::Sms => "Via Twilio",
        }
    }

    pub fn tag(self) -> Option<&'static str> {
        match self {
            ChannelKind::Telegram => Some("Recommended"),
            ChannelKind::WhatsApp => Some("Popular"),
            ChannelKind::Gmail | ChannelKind::Sms => None,
        }
    }

    /// Required credential fields, in form order.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            ChannelKind::Telegram => TELEGRAM_FIELDS,
            ChannelKind::WhatsApp => WHATSAPP_FIELDS,
            ChannelKind::Gmail => GMAIL_FIELDS,
            ChannelKind::Sms => SMS_FIELDS,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ── Credential blocks ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GmailConfig {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub app_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default)]
    pub twilio_sid: String,
    #[serde(default)]
    pub twilio_token: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

/// Credentials for exactly one channel kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelConfig {
    Telegram(TelegramConfig),
    WhatsApp(WhatsAppConfig),
    Gmail(GmailConfig),
    Sms(SmsConfig),
}

impl ChannelConfig {
    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelConfig::Telegram(_) => ChannelKind::Telegram,
            ChannelConfig::WhatsApp(_) => ChannelKind::WhatsApp,
            ChannelConfig::Gmail(_) => ChannelKind::Gmail,
            ChannelConfig::Sms(_) => ChannelKind::Sms,
        }
    }

    /// Build a block from form values.  Missing keys become empty strings,
    /// surrounding whitespace is trimmed, unknown keys are ignored.
    pub fn from_fields(kind: ChannelKind, fields: &FieldMap) -> Self {
        let get = |key: &str| {
            fields
                .get(key)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        match kind {
            ChannelKind::Telegram => ChannelConfig::Telegram(TelegramConfig {
                bot_token: get("bot_token"),
                chat_id: get("chat_id"),
            }),
            ChannelKind::WhatsApp => ChannelConfig::WhatsApp(WhatsAppConfig {
                api_key: get("api_key"),
                phone: get("phone"),
            }),
            ChannelKind::Gmail => ChannelConfig::Gmail(GmailConfig {
                email: get("email"),
                app_password: get("app_password"),
            }),
            ChannelKind::Sms => ChannelConfig::Sms(SmsConfig {
                twilio_sid: get("twilio_sid"),
                twilio_token: get("twilio_token"),
                from: get("from"),
                to: get("to"),
            }),
        }
    }

    /// Form values for this block, keyed like the schema.
    pub fn to_fields(&self) -> FieldMap {
        let pairs: Vec<(&str, &str)> = match self {
            ChannelConfig::Telegram(c) => vec![
                ("bot_token", c.bot_token.as_str()),
                ("chat_id", c.chat_id.as_str()),
            ],
            ChannelConfig::WhatsApp(c) => {
                vec![("api_key", c.api_key.as_str()), ("phone", c.phone.as_str())]
            }
            ChannelConfig::Gmail(c) => vec![
                ("email", c.email.as_str()),
                ("app_password", c.app_password.as_str()),
            ],
            ChannelConfig::Sms(c) => vec![
                ("twilio_sid", c.twilio_sid.as_str()),
                ("twilio_token", c.twilio_token.as_str()),
                ("from", c.from.as_str()),
                ("to", c.to.as_str()),
            ],
        };
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

// ── Validity gate ─────────────────────────────────────────────────────────────

/// Check the form for `kind`: the ngrok token and every schema field must be
/// non-empty after trimming.  On success returns the trimmed block.
pub fn validate(
    kind: ChannelKind,
    fields: &FieldMap,
    ngrok_token: &str,
) -> Result<ChannelConfig, ValidationError> {
    if ngrok_token.trim().is_empty() {
        return Err(ValidationError::MissingNgrokToken);
    }
    for spec in kind.fields() {
        let filled = fields
            .get(spec.key)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);
        if !filled {
            return Err(ValidationError::MissingField {
                channel: kind,
                field: spec.key,
                label: spec.label,
            });
        }
    }
    Ok(ChannelConfig::from_fields(kind, fields))
}

pub fn is_valid(kind: ChannelKind, fields: &FieldMap, ngrok_token: &str) -> bool {
    validate(kind, fields, ngrok_token).is_ok()
}
