//! Error kinds surfaced by the store, the validity gate and the bridge.

use thiserror::Error;

use crate::channel::ChannelKind;

/// A required value was empty before a save was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("ngrok auth token is required")]
    MissingNgrokToken,
    #[error("{} {} is required", channel.display_name(), label)]
    MissingField {
        channel: ChannelKind,
        field: &'static str,
        label: &'static str,
    },
}

/// Reading or writing the persisted config failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Error saving config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error encoding config: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Error saving config: {path} has no parent directory")]
    NoParent { path: String },
}

/// Starting or talking to the bridge process failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The bridge reported a failure outcome; the text is kept verbatim.
    #[error("{0}")]
    StartFailed(String),
    #[error("Error starting bridge: {0}")]
    Spawn(String),
    #[error("Error starting bridge: no outcome within {0}s")]
    StartTimeout(u64),
    #[error("bridge is already running")]
    AlreadyRunning,
    #[error("Error: bridge process exited before reporting an outcome")]
    ProcessGone,
}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        BridgeError::Spawn(e.to_string())
    }
}
