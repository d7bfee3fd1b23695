/// Bridge process driver.
///
/// ```text
///   ProcessBridge::start()
///         │  spawn <command> [args] --config <bridge-config.json>
///         ├── stdout_task  ← JSON lines
///         │                    ├── started  → oneshot back to start()
///         │                    └── log / publicURL / stopped → EventHub
///         ├── stderr_task  ← every line → EventHub(log)
///         └── waiter_task  ← owns the Child; on exit → EventHub(stopped)
///                              └── kill request (reaper) → child.kill()
/// ```
///
/// `stop()` writes `{"command":"stop"}` to stdin and arms a reaper that kills
/// the child if it is still alive after `kill_after`.
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

use bridge_proto::config::BridgeSettings;
use bridge_proto::error::BridgeError;
use bridge_proto::events::{BridgeEvent, EventHub};
use bridge_proto::protocol::{classify_outcome, BridgeCommand, BridgeLine};

/// The bridge collaborator as seen by the controller.
#[async_trait]
pub trait BridgeBackend: Send + Sync {
    /// Launch the bridge and wait for its start outcome.
    async fn start(&self) -> Result<String, BridgeError>;

    /// Ask the bridge to stop.  Completion is signalled on the `stopped` topic.
    async fn stop(&self);

    /// A live bridge that has not been asked to stop.
    fn is_running(&self) -> bool;

    /// A bridge process still exists, even if it is already stopping.
    fn has_process(&self) -> bool {
        self.is_running()
    }

    fn events(&self) -> &EventHub;
}

// ── Process implementation ────────────────────────────────────────────────────

struct LiveChild {
    generation: u64,
    stdin: Option<ChildStdin>,
    kill_tx: Option<oneshot::Sender<()>>,
    stop_requested: bool,
}

pub struct ProcessBridge {
    settings: BridgeSettings,
    config_file: PathBuf,
    hub: EventHub,
    child: Arc<Mutex<Option<LiveChild>>>,
    /// Generation of the live child, 0 when none.
    alive: Arc<AtomicU64>,
    /// Generation most recently asked to stop.  A child in that generation
    /// is on its way out and no longer counts as running.
    stopping: Arc<AtomicU64>,
    next_generation: AtomicU64,
}

impl ProcessBridge {
    pub fn new(settings: BridgeSettings, config_file: PathBuf) -> Self {
        Self {
            settings,
            config_file,
            hub: EventHub::new(),
            child: Arc::new(Mutex::new(None)),
            alive: Arc::new(AtomicU64::new(0)),
            stopping: Arc::new(AtomicU64::new(0)),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Kill a child left over from a previous run that was asked to stop but
    /// has not exited yet.
    async fn reap_previous(&self) -> Result<(), BridgeError> {
        let mut slot = self.child.lock().await;
        if let Some(prev) = slot.as_mut() {
            if !prev.stop_requested {
                return Err(BridgeError::AlreadyRunning);
            }
            if let Some(kill) = prev.kill_tx.take() {
                warn!("bridge: killing lingering process (gen {})", prev.generation);
                let _ = kill.send(());
            }
        }
        *slot = None;
        Ok(())
    }

    async fn request_kill(&self, generation: u64) {
        let mut slot = self.child.lock().await;
        if let Some(live) = slot.as_mut().filter(|c| c.generation == generation) {
            live.stop_requested = true;
            self.stopping.store(generation, Ordering::SeqCst);
            if let Some(kill) = live.kill_tx.take() {
                let _ = kill.send(());
            }
        }
    }
}

#[async_trait]
impl BridgeBackend for ProcessBridge {
    async fn start(&self) -> Result<String, BridgeError> {
        self.reap_previous().await?;

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        info!(
            "bridge: spawning {:?} --config {:?} (gen {})",
            self.settings.command, self.config_file, generation
        );
        let mut child = Command::new(&self.settings.command)
            .args(&self.settings.args)
            .arg("--config")
            .arg(&self.config_file)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        info!("bridge: spawned process with pid {:?}", child.id());

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (started_tx, started_rx) = oneshot::channel::<String>();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        *self.child.lock().await = Some(LiveChild {
            generation,
            stdin,
            kill_tx: Some(kill_tx),
            stop_requested: false,
        });
        self.alive.store(generation, Ordering::SeqCst);

        if let Some(stdout) = stdout {
            let output = OutputSink::new(self.hub.clone(), self.alive.clone(), generation);
            tokio::spawn(stdout_task(stdout, started_tx, output));
        }
        if let Some(stderr) = stderr {
            let output = OutputSink::new(self.hub.clone(), self.alive.clone(), generation);
            tokio::spawn(stderr_task(stderr, output));
        }

        // waiter
        let hub = self.hub.clone();
        let alive = self.alive.clone();
        let slot = self.child.clone();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                Ok(()) = kill_rx => {
                    warn!("bridge: killing process (gen {})", generation);
                    let _ = child.kill().await;
                    child.wait().await
                }
            };
            match status {
                Ok(s) => info!("bridge: process exited with {} (gen {})", s, generation),
                Err(e) => warn!("bridge: wait failed: {} (gen {})", e, generation),
            }
            {
                let mut slot = slot.lock().await;
                if slot.as_ref().map(|c| c.generation) == Some(generation) {
                    *slot = None;
                }
            }
            // A replaced generation exits silently.
            if alive
                .compare_exchange(generation, 0, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                hub.emit(BridgeEvent::Stopped);
            }
        });

        let timeout = self.settings.start_timeout();
        let result = match tokio::time::timeout(timeout, started_rx).await {
            Ok(Ok(outcome)) => classify_outcome(&outcome),
            Ok(Err(_)) => Err(BridgeError::ProcessGone),
            Err(_) => Err(BridgeError::StartTimeout(timeout.as_secs())),
        };
        match &result {
            Ok(outcome) => info!("bridge: started: {}", outcome),
            Err(e) => {
                warn!("bridge: start failed: {}", e);
                self.request_kill(generation).await;
            }
        }
        result
    }

    async fn stop(&self) {
        let generation = {
            let mut slot = self.child.lock().await;
            let Some(live) = slot.as_mut() else {
                debug!("bridge: stop requested with no process");
                return;
            };
            live.stop_requested = true;
            self.stopping.store(live.generation, Ordering::SeqCst);
            if let Some(stdin) = live.stdin.as_mut() {
                match BridgeCommand::Stop.encode() {
                    Ok(line) => {
                        if let Err(e) = stdin.write_all(line.as_bytes()).await {
                            warn!("bridge: failed to write stop command: {}", e);
                        } else {
                            let _ = stdin.flush().await;
                        }
                    }
                    Err(e) => warn!("bridge: failed to encode stop command: {}", e),
                }
            }
            live.generation
        };
        info!("bridge: stop requested (gen {})", generation);

        let kill_after = self.settings.kill_after();
        let slot = self.child.clone();
        tokio::spawn(async move {
            tokio::time::sleep(kill_after).await;
            let mut slot = slot.lock().await;
            if let Some(live) = slot.as_mut().filter(|c| c.generation == generation) {
                if let Some(kill) = live.kill_tx.take() {
                    warn!(
                        "bridge: still alive {:?} after stop, killing (gen {})",
                        kill_after, generation
                    );
                    let _ = kill.send(());
                }
            }
        });
    }

    fn is_running(&self) -> bool {
        let alive = self.alive.load(Ordering::SeqCst);
        alive != 0 && alive != self.stopping.load(Ordering::SeqCst)
    }

    fn has_process(&self) -> bool {
        self.alive.load(Ordering::SeqCst) != 0
    }

    fn events(&self) -> &EventHub {
        &self.hub
    }
}

/// Forwards one child's output to the hub while that child is current.
struct OutputSink {
    hub: EventHub,
    alive: Arc<AtomicU64>,
    generation: u64,
}

impl OutputSink {
    fn new(hub: EventHub, alive: Arc<AtomicU64>, generation: u64) -> Self {
        Self {
            hub,
            alive,
            generation,
        }
    }

    /// Log lines are kept until a newer child takes over (a just-exited child
    /// may still have buffered output).  `stopped` only counts from the live
    /// child.
    fn accepts(&self, event: &BridgeEvent) -> bool {
        let current = self.alive.load(Ordering::SeqCst);
        match event {
            BridgeEvent::Stopped => current == self.generation,
            _ => current == self.generation || current == 0,
        }
    }

    fn emit(&self, event: BridgeEvent) {
        if self.accepts(&event) {
            self.hub.emit(event);
        } else {
            debug!("bridge: dropped {:?} from gen {}", event, self.generation);
        }
    }
}

async fn stdout_task(
    stdout: tokio::process::ChildStdout,
    started_tx: oneshot::Sender<String>,
    output: OutputSink,
) {
    let mut started_tx = Some(started_tx);
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match BridgeLine::parse(&line) {
                Some(BridgeLine::Started { outcome }) => match started_tx.take() {
                    Some(tx) => {
                        let _ = tx.send(outcome);
                    }
                    None => debug!("bridge: duplicate start outcome: {}", outcome),
                },
                Some(other) => {
                    if let Some(event) = other.into_event() {
                        output.emit(event);
                    }
                }
                None => {}
            },
            Ok(None) => break,
            Err(e) => {
                warn!("bridge: stdout read error: {}", e);
                break;
            }
        }
    }
    debug!("bridge: stdout closed");
}

async fn stderr_task(stderr: tokio::process::ChildStderr, output: OutputSink) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.trim().is_empty() {
            output.emit(BridgeEvent::Log(line));
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use bridge_proto::events::Topic;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn sh_bridge(script: &str, start_timeout_secs: u64) -> ProcessBridge {
        let settings = BridgeSettings {
            command: PathBuf::from("sh"),
            // `--config <path>` lands in $1 $2 after the `sh` placeholder for $0.
            args: vec!["-c".into(), script.into(), "sh".into()],
            start_timeout_secs,
            stop_grace_ms: 500,
            kill_after_secs: 1,
        };
        ProcessBridge::new(settings, PathBuf::from("/tmp/bridge-config.json"))
    }

    #[tokio::test]
    async fn test_start_log_and_stop_round_trip() {
        let bridge = sh_bridge(
            r#"echo '{"event":"started","outcome":"Bridge started successfully"}'
               echo "config=$2"
               echo '{"event":"publicURL","url":"https://abc.ngrok.app"}'
               read cmd
               echo "got $cmd" >&2
               sleep 0.2"#,
            5,
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subs: Vec<_> = Topic::ALL
            .into_iter()
            .map(|topic| {
                let tx = tx.clone();
                bridge
                    .events()
                    .subscribe(topic, move |ev| {
                        let _ = tx.send(ev.clone());
                    })
            })
            .collect();

        assert_eq!(
            bridge.start().await,
            Ok("Bridge started successfully".to_string())
        );
        assert!(bridge.is_running());

        bridge.stop().await;

        let mut seen = Vec::new();
        let deadline = Duration::from_secs(5);
        while let Ok(Some(ev)) = tokio::time::timeout(deadline, rx.recv()).await {
            let done = ev == BridgeEvent::Stopped;
            seen.push(ev);
            if done {
                break;
            }
        }
        assert!(seen.contains(&BridgeEvent::Log("config=/tmp/bridge-config.json".into())));
        assert!(seen.contains(&BridgeEvent::PublicUrl("https://abc.ngrok.app".into())));
        assert!(seen.contains(&BridgeEvent::Log(r#"got {"command":"stop"}"#.into())));
        assert_eq!(seen.last(), Some(&BridgeEvent::Stopped));
        assert!(!bridge.is_running());
    }

    #[tokio::test]
    async fn test_error_outcome_is_a_failed_start() {
        let bridge = sh_bridge(
            r#"echo '{"event":"started","outcome":"Error: Ngrok token not configured"}'
               sleep 30"#,
            5,
        );
        assert_eq!(
            bridge.start().await,
            Err(BridgeError::StartFailed(
                "Error: Ngrok token not configured".into()
            ))
        );
    }

    #[tokio::test]
    async fn test_exit_without_outcome() {
        let bridge = sh_bridge("exit 3", 5);
        assert_eq!(bridge.start().await, Err(BridgeError::ProcessGone));
    }

    #[tokio::test]
    async fn test_stop_requested_bridge_is_not_running() {
        // Ignores the stop command; only the reaper ends it.
        let bridge = sh_bridge(
            r#"echo '{"event":"started","outcome":"Bridge started successfully"}'
               sleep 30"#,
            5,
        );
        assert!(bridge.start().await.is_ok());
        assert!(bridge.is_running());

        bridge.stop().await;
        assert!(!bridge.is_running());
        assert!(bridge.has_process());
    }

    #[test]
    fn test_output_from_replaced_child_is_dropped() {
        let alive = Arc::new(AtomicU64::new(2));
        let old = OutputSink::new(EventHub::new(), alive.clone(), 1);
        let current = OutputSink::new(EventHub::new(), alive.clone(), 2);

        assert!(!old.accepts(&BridgeEvent::Log("late".into())));
        assert!(!old.accepts(&BridgeEvent::Stopped));
        assert!(current.accepts(&BridgeEvent::Log("hello".into())));
        assert!(current.accepts(&BridgeEvent::Stopped));

        // After exit, buffered logs still drain but `stopped` is the waiter's.
        alive.store(0, Ordering::SeqCst);
        assert!(current.accepts(&BridgeEvent::Log("bye".into())));
        assert!(!current.accepts(&BridgeEvent::Stopped));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let settings = BridgeSettings {
            command: PathBuf::from("/nonexistent/remote-bridge-service"),
            ..BridgeSettings::default()
        };
        let bridge = ProcessBridge::new(settings, PathBuf::from("cfg.json"));
        assert!(matches!(bridge.start().await, Err(BridgeError::Spawn(_))));
        assert!(!bridge.is_running());
    }
}
