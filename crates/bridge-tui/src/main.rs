mod action;
mod app;
mod app_state;
mod bridge;
mod component;
mod components;
mod controller;
mod theme;
mod widgets;
mod wizard;

use std::sync::Arc;

use bridge_proto::config::Config;
use bridge_proto::store::ConfigStore;
use bridge_proto::update::CURRENT_VERSION;

use crate::app_state::Paths;
use crate::bridge::{BridgeBackend, ProcessBridge};

const USAGE: &str = "\
remote-bridge: set up a notification channel and run the bridge tunnel

USAGE:
    remote-bridge [--help | --version]

Settings are read from the config.toml in the platform config directory.
Logs go to tui.log in the platform data directory.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            "-V" | "--version" => {
                println!("remote-bridge {}", CURRENT_VERSION);
                return Ok(());
            }
            other => anyhow::bail!("unknown argument: {}\n\n{}", other, USAGE),
        }
    }

    let data_dir = bridge_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = Config::log_path();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP client internals quiet.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("remote-bridge log: {}", log_path.display());

    tracing::info!("remote-bridge v{} starting…", CURRENT_VERSION);

    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("config load failed, using defaults: {}", e);
        Config::default()
    });

    // ── Store + bridge backend ───────────────────────────────────────────────
    let store = Arc::new(ConfigStore::new(
        config.store.config_file.clone(),
        config.store.recents_limit,
    ));
    let backend: Arc<dyn BridgeBackend> = Arc::new(ProcessBridge::new(
        config.bridge.clone(),
        store.path().to_path_buf(),
    ));

    let paths = Paths {
        settings_file: Config::config_path(),
        store_file: store.path().to_path_buf(),
        log_file: log_path,
        bridge_command: config.bridge.command.clone(),
    };

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(&config, store, backend, paths);
    app.run().await?;

    tracing::info!("remote-bridge exited");
    Ok(())
}
