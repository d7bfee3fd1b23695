use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

/// Application settings, stored as `config.toml` in the platform config dir.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub updates: UpdateSettings,
}

/// How the external bridge process is launched and stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Executable to spawn.  Defaults to the bundled bridge next to our
    /// binary, falling back to a PATH lookup at spawn time.
    #[serde(default = "default_bridge_command")]
    pub command: PathBuf,
    /// Extra arguments passed before `--config <path>`.
    #[serde(default)]
    pub args: Vec<String>,
    /// How long to wait for the bridge to report its start outcome.
    #[serde(default = "default_start_timeout_secs")]
    pub start_timeout_secs: u64,
    /// Grace window after a stop request before the UI treats the bridge as
    /// stopped without confirmation.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
    /// After a stop request, kill the process if it is still alive this long.
    #[serde(default = "default_kill_after_secs")]
    pub kill_after_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// JSON file holding channel credentials, the ngrok token and recents.
    #[serde(default = "default_config_file")]
    pub config_file: PathBuf,
    #[serde(default = "default_recents_limit")]
    pub recents_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSettings {
    #[serde(default = "default_updates_enabled")]
    pub enabled: bool,
    /// Endpoint returning the latest release as JSON (`tag_name`).
    #[serde(default = "default_release_url")]
    pub release_url: String,
}

impl BridgeSettings {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn kill_after(&self) -> Duration {
        Duration::from_secs(self.kill_after_secs)
    }
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            command: default_bridge_command(),
            args: Vec::new(),
            start_timeout_secs: default_start_timeout_secs(),
            stop_grace_ms: default_stop_grace_ms(),
            kill_after_secs: default_kill_after_secs(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            config_file: default_config_file(),
            recents_limit: default_recents_limit(),
        }
    }
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            enabled: default_updates_enabled(),
            release_url: default_release_url(),
        }
    }
}

fn default_bridge_command() -> PathBuf {
    platform::find_bridge_binary()
        .unwrap_or_else(|| PathBuf::from(platform::bridge_binary_name()))
}

fn default_start_timeout_secs() -> u64 {
    20
}

fn default_stop_grace_ms() -> u64 {
    500
}

fn default_kill_after_secs() -> u64 {
    5
}

fn default_config_file() -> PathBuf {
    // Portable installs keep the credentials file beside the executable
    #[cfg(windows)]
    {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let portable = exe_dir.join("bridge-config.json");
                if portable.exists() {
                    return portable;
                }
            }
        }
    }

    platform::data_dir().join("bridge-config.json")
}

fn default_recents_limit() -> usize {
    5
}

fn default_updates_enabled() -> bool {
    true
}

fn default_release_url() -> String {
    "https://api.github.com/repos/HarshalPatel1972/momentum/releases/latest".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    pub fn log_path() -> PathBuf {
        platform::data_dir().join("tui.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bridge.stop_grace(), Duration::from_millis(500));
        assert_eq!(config.bridge.start_timeout(), Duration::from_secs(20));
        assert_eq!(config.store.recents_limit, 5);
        assert!(config.store.config_file.ends_with("bridge-config.json"));
        assert!(config.updates.release_url.starts_with("https://"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [bridge]
            stop_grace_ms = 1500
            args = ["--region", "eu"]

            [store]
            recents_limit = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.bridge.stop_grace_ms, 1500);
        assert_eq!(config.bridge.args, vec!["--region", "eu"]);
        assert_eq!(config.bridge.kill_after_secs, 5);
        assert_eq!(config.store.recents_limit, 3);
        assert!(config.updates.enabled);
    }

    #[test]
    fn test_toml_round_trip_keeps_values() {
        let mut config = Config::default();
        config.bridge.kill_after_secs = 9;
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.bridge.kill_after_secs, 9);
        assert_eq!(back.store.config_file, config.store.config_file);
    }
}
