//! Action enum: user intents produced by components, dispatched by the App.

use bridge_proto::store::ConfigUpdate;

use crate::wizard::Trigger;

/// Unique identifier for a screen component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Welcome,
    SourceSelect,
    Settings,
    ChannelSelect,
    ConfigForm,
    BridgeControl,
    LogConsole,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Navigation ───────────────────────────────────────────────────────────
    Go(Trigger),

    // ── Config ───────────────────────────────────────────────────────────────
    /// Validated form contents, ready to persist.
    SaveConfig(ConfigUpdate),

    // ── Bridge ───────────────────────────────────────────────────────────────
    StartBridge,
    StopBridge,
    CopyToClipboard(String),

    // ── Settings ─────────────────────────────────────────────────────────────
    CheckUpdates,

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}
