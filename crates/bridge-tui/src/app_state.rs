//! AppState: data shared read-only with every component.
//!
//! The App event loop is the only writer.

use std::path::PathBuf;

use bridge_proto::recents::RecentChannelsIndex;
use bridge_proto::store::PersistedConfig;
use bridge_proto::update::UpdateStatus;

use crate::controller::BridgeController;
use crate::wizard::WizardSession;

/// Locations shown on the Settings screen.
#[derive(Debug, Clone)]
pub struct Paths {
    pub settings_file: PathBuf,
    pub store_file: PathBuf,
    pub log_file: PathBuf,
    pub bridge_command: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UpdateCheck {
    #[default]
    Idle,
    Checking,
    Done(UpdateStatus),
    Failed(String),
}

pub struct AppState {
    pub wizard: WizardSession,
    /// Last loaded copy of the store.  Refreshed on Welcome and after saves.
    pub stored: PersistedConfig,
    pub recents: RecentChannelsIndex,
    pub bridge: BridgeController,
    /// Backend liveness from the last poll.
    pub bridge_running: bool,
    pub saving: bool,
    pub save_error: Option<String>,
    pub update: UpdateCheck,
    pub updates_enabled: bool,
    pub paths: Paths,
}

impl AppState {
    /// Whether the Welcome screen offers "view running bridge".
    pub fn bridge_viewable(&self) -> bool {
        self.bridge_running || self.bridge.is_active()
    }
}
