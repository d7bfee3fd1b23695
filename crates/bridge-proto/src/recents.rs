//! Recently configured channels, most recent first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::ChannelKind;
use crate::store::PersistedConfig;

/// One resume shortcut.  `config_key` joins the entry to its credential block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentChannelEntry {
    pub name: String,
    pub icon: String,
    pub config_key: String,
    pub last_used: DateTime<Utc>,
}

impl RecentChannelEntry {
    pub fn new(kind: ChannelKind, last_used: DateTime<Utc>) -> Self {
        Self {
            name: kind.display_name().to_string(),
            icon: kind.icon().to_string(),
            config_key: kind.key().to_string(),
            last_used,
        }
    }

    /// `None` when the file names a channel this build doesn't know.
    pub fn kind(&self) -> Option<ChannelKind> {
        ChannelKind::from_key(&self.config_key)
    }
}

/// Move `kind` to the front with a fresh timestamp, dropping any older entry
/// for the same kind, then cap the list at `limit`.
pub fn promote(
    entries: &mut Vec<RecentChannelEntry>,
    kind: ChannelKind,
    now: DateTime<Utc>,
    limit: usize,
) {
    entries.retain(|e| e.config_key != kind.key());
    entries.insert(0, RecentChannelEntry::new(kind, now));
    entries.truncate(limit.max(1));
}

/// Read-only view over the persisted recents.
#[derive(Debug, Clone, Default)]
pub struct RecentChannelsIndex {
    entries: Vec<RecentChannelEntry>,
}

impl RecentChannelsIndex {
    pub fn from_config(config: &PersistedConfig) -> Self {
        Self {
            entries: config
                .recent_channels
                .iter()
                .filter(|e| e.kind().is_some())
                .cloned()
                .collect(),
        }
    }

    /// Stored order is already most-recent-first.
    pub fn list(&self) -> &[RecentChannelEntry] {
        &self.entries
    }

    pub fn get(&self, idx: usize) -> Option<&RecentChannelEntry> {
        self.entries.get(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bucketed "time since last use".  Evaluated at draw time, never cached.
pub fn relative_age(entry: &RecentChannelEntry, now: DateTime<Utc>) -> String {
    let secs = (now - entry.last_used).num_seconds();
    if secs < 60 {
        "just now".to_string()
    } else if secs < 3_600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3_600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}
