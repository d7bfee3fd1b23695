//! App: wizard event loop.
//!
//! Architecture:
//! - `App` owns every screen component and `AppState` (read-only to components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks.
//! - Bridge lifecycle events arrive on the controller's own channel.
//! - Components return `Vec<Action>`; App dispatches each Action.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use bridge_proto::config::Config;
use bridge_proto::error::PersistenceError;
use bridge_proto::store::{ConfigStore, ConfigUpdate, SaveReceipt};
use bridge_proto::update::{check_for_updates, UpdateStatus};

use crate::{
    action::Action,
    app_state::{AppState, Paths, UpdateCheck},
    bridge::BridgeBackend,
    component::Component,
    components::{
        bridge_control::BridgeControl, channel_select::ChannelSelect, config_form::ConfigForm,
        settings::SettingsScreen, source_select::SourceSelect, welcome::WelcomeScreen,
    },
    controller::{BridgeController, BridgeStatus, ControllerEvent, Notice, StopReason},
    widgets::toast::{Severity, ToastManager},
    wizard::{Trigger, View, WizardSession},
};

/// Delay before the automatic update check.
const UPDATE_CHECK_DELAY: Duration = Duration::from_secs(3);

/// Messages sent into the App event loop from background tasks.
#[derive(Debug)]
pub enum AppMessage {
    Event(Event),
    Saved(Result<SaveReceipt, PersistenceError>),
    UpdateChecked(Result<UpdateStatus, String>),
}

pub struct App {
    pub state: AppState,
    store: Arc<ConfigStore>,
    backend: Arc<dyn BridgeBackend>,
    controller_rx: Option<mpsc::UnboundedReceiver<ControllerEvent>>,
    release_url: String,
    stop_grace: Duration,

    welcome: WelcomeScreen,
    source_select: SourceSelect,
    settings: SettingsScreen,
    channel_select: ChannelSelect,
    config_form: ConfigForm,
    bridge_control: BridgeControl,

    toast: ToastManager,
    tx: Option<mpsc::Sender<AppMessage>>,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: &Config,
        store: Arc<ConfigStore>,
        backend: Arc<dyn BridgeBackend>,
        paths: Paths,
    ) -> Self {
        let stop_grace = config.bridge.stop_grace();
        let (bridge, controller_rx) = BridgeController::new(backend.clone(), stop_grace);
        let stored = store.load();
        let recents = store.recents();
        let state = AppState {
            wizard: WizardSession::new(),
            stored,
            recents,
            bridge,
            bridge_running: false,
            saving: false,
            save_error: None,
            update: UpdateCheck::Idle,
            updates_enabled: config.updates.enabled,
            paths,
        };
        Self {
            state,
            store,
            backend,
            controller_rx: Some(controller_rx),
            release_url: config.updates.release_url.clone(),
            stop_grace,
            welcome: WelcomeScreen::new(),
            source_select: SourceSelect::new(),
            settings: SettingsScreen::new(),
            channel_select: ChannelSelect::new(),
            config_form: ConfigForm::new(),
            bridge_control: BridgeControl::new(),
            toast: ToastManager::new(),
            tx: None,
            should_quit: false,
        }
    }

    fn current(&mut self) -> &mut dyn Component {
        match self.state.wizard.view() {
            View::Welcome => &mut self.welcome,
            View::SourceSelect => &mut self.source_select,
            View::Settings => &mut self.settings,
            View::ChannelSelect => &mut self.channel_select,
            View::Config => &mut self.config_form,
            View::BridgeControl => &mut self.bridge_control,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);
        self.tx = Some(tx.clone());
        let mut controller_rx = match self.controller_rx.take() {
            Some(rx) => rx,
            None => anyhow::bail!("App::run called twice"),
        };

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: delayed update check ─────────────────────────────
        if self.state.updates_enabled {
            self.state.update = UpdateCheck::Checking;
            let url = self.release_url.clone();
            let update_tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(UPDATE_CHECK_DELAY).await;
                let result = check_for_updates(&url).await.map_err(|e| e.to_string());
                let _ = update_tx.send(AppMessage::UpdateChecked(result)).await;
            });
        }

        // ── Periodic timers ───────────────────────────────────────────────────
        // Toast expiry + spinner animation, bridge liveness poll.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        self.on_enter_view();

        // ── Main loop ─────────────────────────────────────────────────────────
        loop {
            terminal.draw(|f| self.draw(f))?;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    self.handle_message(msg).await;
                }

                Some(ev) = controller_rx.recv() => {
                    if let Some(notice) = self.state.bridge.handle(ev) {
                        self.on_notice(notice);
                    }
                }

                _ = ui_tick.tick() => {
                    self.toast.tick();
                    self.state.bridge_running = self.backend.is_running();
                    let actions = {
                        let state = &self.state;
                        match state.wizard.view() {
                            View::Welcome => self.welcome.tick(state),
                            View::SourceSelect => self.source_select.tick(state),
                            View::Settings => self.settings.tick(state),
                            View::ChannelSelect => self.channel_select.tick(state),
                            View::Config => self.config_form.tick(state),
                            View::BridgeControl => self.bridge_control.tick(state),
                        }
                    };
                    for action in actions {
                        self.dispatch(action).await;
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        self.shutdown_bridge().await;
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        Ok(())
    }

    /// Ask a live bridge to stop and give it the grace window to exit.
    async fn shutdown_bridge(&mut self) {
        if self.backend.has_process() {
            if self.backend.is_running() {
                info!("quit: stopping bridge");
                self.backend.stop().await;
            }
            let deadline = tokio::time::Instant::now() + self.stop_grace;
            while self.backend.has_process() && tokio::time::Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            if self.backend.has_process() {
                warn!("quit: bridge still running after {:?}", self.stop_grace);
            }
        }
        self.state.bridge.shutdown();
    }

    // ── Message handling ──────────────────────────────────────────────────────

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                if key.kind == KeyEventKind::Release {
                    return;
                }
                self.handle_key(key).await;
            }
            AppMessage::Event(_) => {}
            AppMessage::Saved(Ok(receipt)) => {
                self.state.saving = false;
                self.state.save_error = None;
                info!("config saved for {}", receipt.kind());
                self.toast
                    .resolve_spinner(Severity::Success, "Saved!", Duration::from_secs(2));
                self.refresh_stored();
                self.go(Trigger::SaveComplete(receipt));
            }
            AppMessage::Saved(Err(e)) => {
                self.state.saving = false;
                error!("config save failed: {}", e);
                self.toast.dismiss_spinner();
                self.toast.error(format!("save failed: {}", e));
                self.state.save_error = Some(e.to_string());
            }
            AppMessage::UpdateChecked(result) => {
                self.state.update = match result {
                    Ok(UpdateStatus::Available { version, url }) => {
                        self.toast.info(format!("update available: v{}", version));
                        UpdateCheck::Done(UpdateStatus::Available { version, url })
                    }
                    Ok(status) => UpdateCheck::Done(status),
                    Err(e) => {
                        warn!("update check failed: {}", e);
                        UpdateCheck::Failed(e)
                    }
                };
            }
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            self.dispatch(Action::Quit).await;
            return;
        }
        let captures_text = self.current().captures_text();
        if !captures_text && key.code == KeyCode::Char('q') {
            self.dispatch(Action::Quit).await;
            return;
        }
        let actions = {
            let state = &self.state;
            match state.wizard.view() {
                View::Welcome => self.welcome.handle_key(key, state),
                View::SourceSelect => self.source_select.handle_key(key, state),
                View::Settings => self.settings.handle_key(key, state),
                View::ChannelSelect => self.channel_select.handle_key(key, state),
                View::Config => self.config_form.handle_key(key, state),
                View::BridgeControl => self.bridge_control.handle_key(key, state),
            }
        };
        for action in actions {
            self.dispatch(action).await;
        }
    }

    fn on_notice(&mut self, notice: Notice) {
        match notice {
            Notice::Started(outcome) => {
                info!("bridge started: {}", outcome);
                self.toast.success("bridge started");
            }
            Notice::StartFailed(message) => {
                self.toast.error(format!("start failed: {}", message));
            }
            Notice::Stopped(reason) => {
                if reason == StopReason::Exited {
                    self.toast.warning("bridge exited");
                } else {
                    self.toast.info("bridge stopped");
                }
                if self.state.wizard.view() == View::BridgeControl {
                    self.go(Trigger::StopConfirmed);
                }
            }
        }
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        debug!("apply_action: {:?}", action);
        match action {
            // ── Navigation ────────────────────────────────────────────────────
            Action::Go(trigger) => self.go(trigger),

            // ── Config ────────────────────────────────────────────────────────
            Action::SaveConfig(update) => self.save_config(update),

            // ── Bridge ────────────────────────────────────────────────────────
            Action::StartBridge => {
                if self.state.bridge.start() {
                    self.toast.info("starting bridge…");
                }
            }
            Action::StopBridge => {
                self.state.bridge.stop();
            }
            Action::CopyToClipboard(text) => {
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
                    Ok(()) => {
                        let display = if text.chars().count() > 40 {
                            format!("{}…", text.chars().take(40).collect::<String>())
                        } else {
                            text.clone()
                        };
                        self.toast.success(format!("copied: {}", display));
                    }
                    Err(e) => {
                        warn!("clipboard error: {}", e);
                        self.toast.error(format!("clipboard error: {}", e));
                    }
                }
            }

            // ── Settings ──────────────────────────────────────────────────────
            Action::CheckUpdates => self.check_updates(),

            // ── System ────────────────────────────────────────────────────────
            Action::Quit => {
                info!("quit requested");
                self.should_quit = true;
            }
        }
    }

    fn go(&mut self, trigger: Trigger) {
        let name = trigger.name();
        match self.state.wizard.fire(trigger) {
            Ok(view) => {
                debug!("wizard: {} -> {:?}", name, view);
                self.on_enter_view();
            }
            Err(e) => debug!("wizard: {}", e),
        }
    }

    /// Per-view entry work, then let the component reset its own state.
    fn on_enter_view(&mut self) {
        match self.state.wizard.view() {
            View::Welcome => self.refresh_stored(),
            View::Config => self.state.save_error = None,
            View::BridgeControl => {
                if self.state.bridge.status() == BridgeStatus::NotStarted
                    && self.backend.is_running()
                {
                    self.state.bridge.adopt_running();
                }
            }
            _ => {}
        }
        let state = &self.state;
        match state.wizard.view() {
            View::Welcome => self.welcome.on_enter(state),
            View::SourceSelect => self.source_select.on_enter(state),
            View::Settings => self.settings.on_enter(state),
            View::ChannelSelect => self.channel_select.on_enter(state),
            View::Config => self.config_form.on_enter(state),
            View::BridgeControl => self.bridge_control.on_enter(state),
        }
        debug!("on_enter: {:?}", self.current().id());
    }

    fn refresh_stored(&mut self) {
        self.state.stored = self.store.load();
        self.state.recents = self.store.recents();
    }

    fn save_config(&mut self, update: ConfigUpdate) {
        if self.state.saving {
            return;
        }
        let Some(tx) = self.tx.clone() else {
            return;
        };
        self.state.saving = true;
        self.state.save_error = None;
        self.toast.spinner("Saving…");
        let store = self.store.clone();
        tokio::spawn(async move {
            let result = store.save(update).await;
            let _ = tx.send(AppMessage::Saved(result)).await;
        });
    }

    fn check_updates(&mut self) {
        let Some(tx) = self.tx.clone() else {
            return;
        };
        self.state.update = UpdateCheck::Checking;
        let url = self.release_url.clone();
        tokio::spawn(async move {
            let result = check_for_updates(&url).await.map_err(|e| e.to_string());
            let _ = tx.send(AppMessage::UpdateChecked(result)).await;
        });
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        use crate::theme::C_BG;
        use ratatui::widgets::Block;
        let area = frame.area();

        frame.render_widget(
            Block::default().style(ratatui::style::Style::default().bg(C_BG)),
            area,
        );

        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0)])
            .margin(1)
            .split(area)[0];

        let state = &self.state;
        match state.wizard.view() {
            View::Welcome => self.welcome.draw(frame, body, state),
            View::SourceSelect => self.source_select.draw(frame, body, state),
            View::Settings => self.settings.draw(frame, body, state),
            View::ChannelSelect => self.channel_select.draw(frame, body, state),
            View::Config => self.config_form.draw(frame, body, state),
            View::BridgeControl => self.bridge_control.draw(frame, body, state),
        }

        self.toast.draw(frame, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use bridge_proto::channel::{ChannelKind, Source};
    use bridge_proto::error::BridgeError;
    use bridge_proto::events::EventHub;
    use tempfile::TempDir;

    struct FakeBridge {
        hub: EventHub,
        running: AtomicBool,
    }

    #[async_trait]
    impl BridgeBackend for FakeBridge {
        async fn start(&self) -> Result<String, BridgeError> {
            self.running.store(true, Ordering::SeqCst);
            Ok("Bridge started successfully".into())
        }

        async fn stop(&self) {
            self.running.store(false, Ordering::SeqCst);
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        fn events(&self) -> &EventHub {
            &self.hub
        }
    }

    fn app_with(store_file: &Path, running: bool) -> (App, mpsc::Receiver<AppMessage>) {
        let backend = Arc::new(FakeBridge {
            hub: EventHub::new(),
            running: AtomicBool::new(running),
        });
        let store = Arc::new(ConfigStore::new(store_file.to_path_buf(), 5));
        let paths = Paths {
            settings_file: store_file.with_file_name("config.toml"),
            store_file: store_file.to_path_buf(),
            log_file: store_file.with_file_name("tui.log"),
            bridge_command: "remote-bridge-server".into(),
        };
        let mut app = App::new(&Config::default(), store, backend, paths);
        let (tx, rx) = mpsc::channel(8);
        app.tx = Some(tx);
        (app, rx)
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
                .await;
        }
    }

    async fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).await;
    }

    /// Welcome -> Source -> Channel -> Config for Telegram, then fill the form.
    async fn fill_telegram_form(app: &mut App) {
        app.go(Trigger::Start);
        app.go(Trigger::ChooseSource(Source::Agent));
        app.go(Trigger::ChooseChannel(ChannelKind::Telegram));
        assert_eq!(app.state.wizard.view(), View::Config);

        type_text(app, "123:abc").await;
        press(app, KeyCode::Tab).await;
        type_text(app, "42").await;
        press(app, KeyCode::Tab).await;
        type_text(app, "tok").await;
    }

    async fn submit(app: &mut App, rx: &mut mpsc::Receiver<AppMessage>) {
        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL))
            .await;
        assert!(app.state.saving);
        let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("save result")
            .expect("channel open");
        app.handle_message(msg).await;
        assert!(!app.state.saving);
    }

    #[tokio::test]
    async fn test_successful_save_opens_bridge_control() {
        let dir = TempDir::new().unwrap();
        let (mut app, mut rx) = app_with(&dir.path().join("bridge-config.json"), false);

        fill_telegram_form(&mut app).await;
        submit(&mut app, &mut rx).await;

        assert_eq!(app.state.wizard.view(), View::BridgeControl);
        assert_eq!(app.state.wizard.return_target(), View::Config);
        assert!(app.state.save_error.is_none());
        assert_eq!(app.state.stored.ngrok_token, "tok");
        assert_eq!(app.state.recents.len(), 1);
        assert_eq!(
            app.state.recents.get(0).and_then(|e| e.kind()),
            Some(ChannelKind::Telegram)
        );
        assert_eq!(app.state.bridge.status(), BridgeStatus::NotStarted);

        press(&mut app, KeyCode::Esc).await;
        assert_eq!(app.state.wizard.view(), View::Config);
    }

    #[tokio::test]
    async fn test_failed_save_stays_on_form_with_values() {
        let dir = TempDir::new().unwrap();
        // A regular file where the store's directory should be.
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let (mut app, mut rx) = app_with(&blocker.join("bridge-config.json"), false);

        fill_telegram_form(&mut app).await;
        submit(&mut app, &mut rx).await;

        assert_eq!(app.state.wizard.view(), View::Config);
        assert!(app.state.save_error.is_some());
        let draft = app.config_form.draft().expect("form loaded");
        assert_eq!(draft.fields.get("bot_token").map(String::as_str), Some("123:abc"));
        assert_eq!(draft.fields.get("chat_id").map(String::as_str), Some("42"));
        assert_eq!(draft.ngrok_token, "tok");
    }

    #[tokio::test]
    async fn test_stop_notice_returns_to_welcome() {
        let dir = TempDir::new().unwrap();
        let (mut app, mut rx) = app_with(&dir.path().join("bridge-config.json"), false);
        fill_telegram_form(&mut app).await;
        submit(&mut app, &mut rx).await;
        assert_eq!(app.state.wizard.view(), View::BridgeControl);

        app.on_notice(Notice::Stopped(StopReason::Confirmed));
        assert_eq!(app.state.wizard.view(), View::Welcome);

        // Off the bridge screen a late notice changes nothing.
        app.on_notice(Notice::Stopped(StopReason::Exited));
        assert_eq!(app.state.wizard.view(), View::Welcome);
    }

    #[tokio::test]
    async fn test_viewing_a_live_bridge_adopts_it() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = app_with(&dir.path().join("bridge-config.json"), true);
        app.state.bridge_running = app.backend.is_running();
        assert!(app.state.bridge_viewable());

        press(&mut app, KeyCode::Char('b')).await;
        assert_eq!(app.state.wizard.view(), View::BridgeControl);
        assert_eq!(app.state.bridge.status(), BridgeStatus::Running);
    }

    #[tokio::test]
    async fn test_stopped_bridge_is_not_offered() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = app_with(&dir.path().join("bridge-config.json"), false);
        app.state.bridge_running = app.backend.is_running();
        assert!(!app.state.bridge_viewable());

        press(&mut app, KeyCode::Char('b')).await;
        assert_eq!(app.state.wizard.view(), View::Welcome);
        assert_eq!(app.state.bridge.status(), BridgeStatus::NotStarted);
    }
}
