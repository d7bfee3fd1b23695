//! ConfigStore: sole owner and writer of the persisted bridge config.
//!
//! On-disk shape (JSON):
//!
//! ```text
//! {
//!   "channel": "telegram",
//!   "source": "agent",
//!   "telegram": { "bot_token": "...", "chat_id": "..." },
//!   "ngrokToken": "...",
//!   "recentChannels": [ { "name", "icon", "config_key", "last_used" } ]
//! }
//! ```
//!
//! Only configured channel blocks are present.  Saves merge one channel's
//! block into whatever is on disk and are all-or-nothing: the new document
//! goes to a sibling temp file which is then renamed over the original.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::channel::{
    ChannelConfig, ChannelKind, GmailConfig, SmsConfig, Source, TelegramConfig, WhatsAppConfig,
};
use crate::error::PersistenceError;
use crate::recents::{self, RecentChannelEntry, RecentChannelsIndex};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistedConfig {
    /// Channel of the most recent save.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub channel: Option<ChannelKind>,
    /// Source of the most recent save.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<WhatsAppConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gmail: Option<GmailConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms: Option<SmsConfig>,
    #[serde(default, rename = "ngrokToken")]
    pub ngrok_token: String,
    #[serde(default, rename = "recentChannels")]
    pub recent_channels: Vec<RecentChannelEntry>,
}

/// Unknown or empty tags (older files wrote `""`) read as absent instead of
/// failing the whole document.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

impl PersistedConfig {
    /// The stored block for `kind`, if that channel has been configured.
    pub fn channel_config(&self, kind: ChannelKind) -> Option<ChannelConfig> {
        match kind {
            ChannelKind::Telegram => self.telegram.clone().map(ChannelConfig::Telegram),
            ChannelKind::WhatsApp => self.whatsapp.clone().map(ChannelConfig::WhatsApp),
            ChannelKind::Gmail => self.gmail.clone().map(ChannelConfig::Gmail),
            ChannelKind::Sms => self.sms.clone().map(ChannelConfig::Sms),
        }
    }

    /// Replace the block for the config's kind; other kinds are untouched.
    pub fn set_channel_config(&mut self, config: ChannelConfig) {
        match config {
            ChannelConfig::Telegram(c) => self.telegram = Some(c),
            ChannelConfig::WhatsApp(c) => self.whatsapp = Some(c),
            ChannelConfig::Gmail(c) => self.gmail = Some(c),
            ChannelConfig::Sms(c) => self.sms = Some(c),
        }
    }

    pub fn configured_kinds(&self) -> Vec<ChannelKind> {
        ChannelKind::ALL
            .into_iter()
            .filter(|k| self.channel_config(*k).is_some())
            .collect()
    }

    /// Drop blocks whose fields are all empty, so "present" means configured.
    fn normalize(mut self) -> Self {
        for kind in ChannelKind::ALL {
            let empty = self
                .channel_config(kind)
                .map(|c| c.to_fields().values().all(|v| v.is_empty()))
                .unwrap_or(false);
            if empty {
                match kind {
                    ChannelKind::Telegram => self.telegram = None,
                    ChannelKind::WhatsApp => self.whatsapp = None,
                    ChannelKind::Gmail => self.gmail = None,
                    ChannelKind::Sms => self.sms = None,
                }
            }
        }
        self
    }
}

/// One save request: a channel block plus the shared token and tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub channel: ChannelConfig,
    pub source: Source,
    pub ngrok_token: String,
}

/// Proof that a save reached disk.  Only the store constructs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    kind: ChannelKind,
    saved_at: DateTime<Utc>,
}

impl SaveReceipt {
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn saved_at(&self) -> DateTime<Utc> {
        self.saved_at
    }
}

pub struct ConfigStore {
    path: PathBuf,
    recents_limit: usize,
}

impl ConfigStore {
    pub fn new(path: PathBuf, recents_limit: usize) -> Self {
        Self {
            path,
            recents_limit: recents_limit.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored config.  A missing or unreadable file yields an empty
    /// config; callers never see a partially parsed document.
    pub fn load(&self) -> PersistedConfig {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("store: no config at {:?}", self.path);
                return PersistedConfig::default();
            }
            Err(e) => {
                warn!("store: failed to read {:?}: {}", self.path, e);
                return PersistedConfig::default();
            }
        };
        if content.trim().is_empty() {
            return PersistedConfig::default();
        }
        match serde_json::from_str::<PersistedConfig>(&content) {
            Ok(config) => config.normalize(),
            Err(e) => {
                warn!("store: ignoring malformed config {:?}: {}", self.path, e);
                PersistedConfig::default()
            }
        }
    }

    pub fn recents(&self) -> RecentChannelsIndex {
        RecentChannelsIndex::from_config(&self.load())
    }

    pub async fn save(&self, update: ConfigUpdate) -> Result<SaveReceipt, PersistenceError> {
        self.save_at(update, Utc::now()).await
    }

    /// Merge `update` into the stored config and promote its channel in the
    /// recents list, stamped with `now`.
    pub async fn save_at(
        &self,
        update: ConfigUpdate,
        now: DateTime<Utc>,
    ) -> Result<SaveReceipt, PersistenceError> {
        let kind = update.channel.kind();
        let mut config = self.load();
        config.set_channel_config(update.channel);
        config.ngrok_token = update.ngrok_token.trim().to_string();
        config.channel = Some(kind);
        config.source = Some(update.source);
        recents::promote(&mut config.recent_channels, kind, now, self.recents_limit);

        let json = serde_json::to_string_pretty(&config)?;
        self.write_atomic(json.as_bytes()).await?;

        info!("store: saved {} config to {:?}", kind.key(), self.path);
        Ok(SaveReceipt {
            kind,
            saved_at: now,
        })
    }

    async fn write_atomic(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| PersistenceError::NoParent {
                path: self.path.display().to_string(),
            })?;
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("bridge-config.json"), 5)
    }

    fn telegram(token: &str, chat: &str) -> ChannelConfig {
        ChannelConfig::Telegram(TelegramConfig {
            bot_token: token.into(),
            chat_id: chat.into(),
        })
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let config = store_in(&dir).load();
        assert_eq!(config, PersistedConfig::default());
    }

    #[test]
    fn test_malformed_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{ \"telegram\": { \"bot_token\": ").unwrap();
        assert_eq!(store.load(), PersistedConfig::default());

        std::fs::write(store.path(), "[1, 2, 3]").unwrap();
        assert_eq!(store.load(), PersistedConfig::default());
    }

    #[test]
    fn test_legacy_file_with_empty_blocks_and_tags() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"{
              "channel": "",
              "source": "",
              "telegram": { "bot_token": "123:abc", "chat_id": "42" },
              "gmail": { "email": "", "app_password": "" },
              "whatsapp": { "api_key": "", "phone": "" },
              "sms": { "twilio_sid": "", "twilio_token": "", "from": "", "to": "" },
              "ngrokToken": "ngrok-1"
            }"#,
        )
        .unwrap();

        let config = store.load();
        assert_eq!(config.channel, None);
        assert_eq!(config.source, None);
        assert_eq!(config.configured_kinds(), vec![ChannelKind::Telegram]);
        assert_eq!(config.ngrok_token, "ngrok-1");
    }

    #[tokio::test]
    async fn test_save_writes_tags_and_recents() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let receipt = store
            .save_at(
                ConfigUpdate {
                    channel: telegram("123:abc", "42"),
                    source: Source::Mcp,
                    ngrok_token: " ngrok-1 ".into(),
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(receipt.kind(), ChannelKind::Telegram);
        assert_eq!(receipt.saved_at(), now);

        let config = store.load();
        assert_eq!(config.channel, Some(ChannelKind::Telegram));
        assert_eq!(config.source, Some(Source::Mcp));
        assert_eq!(config.ngrok_token, "ngrok-1");
        assert_eq!(config.recent_channels.len(), 1);
        assert_eq!(config.recent_channels[0].config_key, "telegram");
        assert_eq!(config.recent_channels[0].last_used, now);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save(ConfigUpdate {
                channel: telegram("a", "b"),
                source: Source::Agent,
                ngrok_token: "tok".into(),
            })
            .await
            .unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        // A directory squatting on the temp path makes the write fail.
        std::fs::create_dir(store.path().with_extension("json.tmp")).unwrap();
        let result = store
            .save(ConfigUpdate {
                channel: telegram("c", "d"),
                source: Source::Agent,
                ngrok_token: "tok2".into(),
            })
            .await;
        assert!(matches!(result, Err(PersistenceError::Io(_))));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_serialized_keys_match_schema() {
        let mut config = PersistedConfig {
            ngrok_token: "tok".into(),
            ..PersistedConfig::default()
        };
        config.set_channel_config(telegram("a", "b"));
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("ngrokToken").is_some());
        assert!(value.get("recentChannels").is_some());
        assert!(value.get("telegram").is_some());
        assert!(value.get("gmail").is_none());
    }
}
