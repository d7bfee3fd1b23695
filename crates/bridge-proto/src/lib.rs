//! Shared model for the remote-bridge wizard: channel credentials, the
//! persisted config store, the recents index, the bridge event hub and the
//! wire format spoken with the bridge process.

pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod platform;
pub mod protocol;
pub mod recents;
pub mod store;
pub mod update;
