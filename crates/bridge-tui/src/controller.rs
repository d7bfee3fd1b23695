//! Bridge lifecycle: NotStarted → Starting → Running → Stopping → NotStarted.
//!
//! The controller is owned by the app loop and never blocks it.  Backend
//! calls and the stop grace timer run on spawned tasks and report back as
//! [`ControllerEvent`]s, which the loop feeds to [`BridgeController::handle`].
//! Bridge topics are forwarded into the same channel.
//!
//! Stopping has two completion paths, the bridge's `stopped` event and the
//! grace timer.  Both call `finalize_stop`, which is guarded by status, so
//! whichever arrives second is a no-op.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use bridge_proto::error::BridgeError;
use bridge_proto::events::{BridgeEvent, Subscription, Topic};

use crate::bridge::BridgeBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeStatus {
    #[default]
    NotStarted,
    Starting,
    Running,
    Stopping,
}

impl BridgeStatus {
    pub fn label(self) -> &'static str {
        match self {
            BridgeStatus::NotStarted => "READY",
            BridgeStatus::Starting => "STARTING",
            BridgeStatus::Running => "RUNNING",
            BridgeStatus::Stopping => "STOPPING",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub received_at: DateTime<Local>,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct BridgeRuntimeState {
    pub status: BridgeStatus,
    pub logs: Vec<LogEntry>,
    pub public_url: Option<String>,
}

#[derive(Debug)]
pub enum ControllerEvent {
    Bridge(BridgeEvent),
    StartFinished {
        run: u64,
        result: Result<String, BridgeError>,
    },
    StopGraceElapsed {
        run: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The bridge confirmed after a stop request.
    Confirmed,
    /// No confirmation within the grace window.
    GraceElapsed,
    /// The bridge went away without being asked.
    Exited,
}

/// Lifecycle changes the wizard reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Started(String),
    StartFailed(String),
    Stopped(StopReason),
}

pub struct BridgeController {
    backend: Arc<dyn BridgeBackend>,
    state: BridgeRuntimeState,
    run: u64,
    stop_grace: Duration,
    tx: mpsc::UnboundedSender<ControllerEvent>,
    subscriptions: Vec<Subscription>,
}

impl BridgeController {
    pub fn new(
        backend: Arc<dyn BridgeBackend>,
        stop_grace: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriptions = Topic::ALL
            .into_iter()
            .map(|topic| {
                let tx = tx.clone();
                backend.events().subscribe(topic, move |ev| {
                    let _ = tx.send(ControllerEvent::Bridge(ev.clone()));
                })
            })
            .collect();
        let controller = Self {
            backend,
            state: BridgeRuntimeState::default(),
            run: 0,
            stop_grace,
            tx,
            subscriptions,
        };
        (controller, rx)
    }

    pub fn state(&self) -> &BridgeRuntimeState {
        &self.state
    }

    pub fn status(&self) -> BridgeStatus {
        self.state.status
    }

    pub fn is_active(&self) -> bool {
        self.state.status != BridgeStatus::NotStarted
    }

    /// Begin a start.  Returns `false` (and does nothing) unless NotStarted.
    pub fn start(&mut self) -> bool {
        if self.state.status != BridgeStatus::NotStarted {
            debug!("controller: start ignored in {:?}", self.state.status);
            return false;
        }
        self.run += 1;
        self.state.status = BridgeStatus::Starting;
        info!("controller: starting bridge (run {})", self.run);

        let run = self.run;
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = backend.start().await;
            let _ = tx.send(ControllerEvent::StartFinished { run, result });
        });
        true
    }

    /// Begin a stop.  Returns `false` (and does nothing) unless Running.
    pub fn stop(&mut self) -> bool {
        if self.state.status != BridgeStatus::Running {
            debug!("controller: stop ignored in {:?}", self.state.status);
            return false;
        }
        self.state.status = BridgeStatus::Stopping;
        info!("controller: stopping bridge (run {})", self.run);

        let backend = self.backend.clone();
        tokio::spawn(async move {
            backend.stop().await;
        });

        let run = self.run;
        let grace = self.stop_grace;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = tx.send(ControllerEvent::StopGraceElapsed { run });
        });
        true
    }

    /// Take over a bridge that is already running (e.g. started before the
    /// wizard reached the bridge screen).
    pub fn adopt_running(&mut self) {
        if self.state.status == BridgeStatus::NotStarted {
            self.run += 1;
            self.state.status = BridgeStatus::Running;
            info!("controller: adopted running bridge (run {})", self.run);
        }
    }

    pub fn handle(&mut self, event: ControllerEvent) -> Option<Notice> {
        match event {
            ControllerEvent::Bridge(BridgeEvent::Log(message)) => {
                self.state.logs.push(LogEntry {
                    received_at: Local::now(),
                    message,
                });
                None
            }
            ControllerEvent::Bridge(BridgeEvent::PublicUrl(url)) => {
                if self.state.status == BridgeStatus::NotStarted {
                    debug!("controller: public URL ignored while not started");
                } else {
                    info!("controller: public URL {}", url);
                    self.state.public_url = Some(url);
                }
                None
            }
            ControllerEvent::Bridge(BridgeEvent::Stopped) => match self.state.status {
                BridgeStatus::Stopping => self.finalize_stop(StopReason::Confirmed),
                BridgeStatus::Running => self.finalize_stop(StopReason::Exited),
                // Starting: the pending start reports the failure.
                BridgeStatus::Starting | BridgeStatus::NotStarted => None,
            },
            ControllerEvent::StartFinished { run, result } => {
                if run != self.run || self.state.status != BridgeStatus::Starting {
                    debug!("controller: stale start result for run {}", run);
                    return None;
                }
                match result {
                    Ok(outcome) => {
                        self.state.status = BridgeStatus::Running;
                        Some(Notice::Started(outcome))
                    }
                    Err(e) => {
                        let message = e.to_string();
                        warn!("controller: start failed: {}", message);
                        self.state.logs.push(LogEntry {
                            received_at: Local::now(),
                            message: format!("❌ {}", message),
                        });
                        self.state.status = BridgeStatus::NotStarted;
                        self.state.public_url = None;
                        Some(Notice::StartFailed(message))
                    }
                }
            }
            ControllerEvent::StopGraceElapsed { run } => {
                if run != self.run || self.state.status != BridgeStatus::Stopping {
                    return None;
                }
                warn!(
                    "controller: no stop confirmation within {:?}, treating as stopped",
                    self.stop_grace
                );
                self.finalize_stop(StopReason::GraceElapsed)
            }
        }
    }

    /// Reset to NotStarted with empty logs and no URL.  Idempotent.
    fn finalize_stop(&mut self, reason: StopReason) -> Option<Notice> {
        if self.state.status == BridgeStatus::NotStarted {
            return None;
        }
        info!("controller: bridge stopped ({:?})", reason);
        self.state = BridgeRuntimeState::default();
        Some(Notice::Stopped(reason))
    }

    /// Drop every bridge subscription.
    pub fn shutdown(&mut self) {
        for sub in self.subscriptions.drain(..) {
            sub.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_proto::events::EventHub;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory bridge: start returns a scripted result, stop only counts.
    struct ScriptedBackend {
        hub: EventHub,
        start_result: Mutex<Result<String, BridgeError>>,
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(start_result: Result<String, BridgeError>) -> Arc<Self> {
            Arc::new(Self {
                hub: EventHub::new(),
                start_result: Mutex::new(start_result),
                starts: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl BridgeBackend for ScriptedBackend {
        async fn start(&self) -> Result<String, BridgeError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.start_result.lock().unwrap().clone()
        }

        async fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn is_running(&self) -> bool {
            false
        }

        fn events(&self) -> &EventHub {
            &self.hub
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<ControllerEvent>) -> ControllerEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("controller event")
            .expect("channel open")
    }

    async fn running(
        backend: Arc<ScriptedBackend>,
        grace: Duration,
    ) -> (BridgeController, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (mut ctl, mut rx) = BridgeController::new(backend, grace);
        assert!(ctl.start());
        let ev = next(&mut rx).await;
        assert_eq!(
            ctl.handle(ev),
            Some(Notice::Started("Bridge started successfully".into()))
        );
        assert_eq!(ctl.status(), BridgeStatus::Running);
        (ctl, rx)
    }

    #[tokio::test]
    async fn test_double_start_calls_backend_once() {
        let backend = ScriptedBackend::new(Ok("Bridge started successfully".into()));
        let (mut ctl, mut rx) = BridgeController::new(backend.clone(), Duration::from_millis(500));

        assert!(ctl.start());
        assert!(!ctl.start());
        assert_eq!(ctl.status(), BridgeStatus::Starting);

        let ev = next(&mut rx).await;
        ctl.handle(ev);
        assert!(!ctl.start());
        assert_eq!(backend.starts.load(Ordering::SeqCst), 1);
        assert_eq!(ctl.status(), BridgeStatus::Running);
    }

    #[tokio::test]
    async fn test_stop_without_confirmation_finishes_after_grace() {
        let backend = ScriptedBackend::new(Ok("Bridge started successfully".into()));
        let (mut ctl, mut rx) = running(backend.clone(), Duration::from_millis(50)).await;

        backend
            .hub
            .emit(BridgeEvent::PublicUrl("https://abc.ngrok.app".into()));
        let ev = next(&mut rx).await;
        ctl.handle(ev);
        assert_eq!(
            ctl.state().public_url.as_deref(),
            Some("https://abc.ngrok.app")
        );

        assert!(ctl.stop());
        assert_eq!(ctl.status(), BridgeStatus::Stopping);

        let ev = next(&mut rx).await;
        assert!(matches!(ev, ControllerEvent::StopGraceElapsed { .. }));
        assert_eq!(
            ctl.handle(ev),
            Some(Notice::Stopped(StopReason::GraceElapsed))
        );
        assert_eq!(ctl.status(), BridgeStatus::NotStarted);
        assert_eq!(ctl.state().public_url, None);
        assert_eq!(backend.stops.load(Ordering::SeqCst), 1);

        // The confirmation arriving late changes nothing.
        backend.hub.emit(BridgeEvent::Stopped);
        let ev = next(&mut rx).await;
        assert_eq!(ctl.handle(ev), None);
        assert_eq!(ctl.status(), BridgeStatus::NotStarted);
    }

    #[tokio::test]
    async fn test_confirmed_stop_then_timer_is_noop() {
        let backend = ScriptedBackend::new(Ok("Bridge started successfully".into()));
        let (mut ctl, mut rx) = running(backend.clone(), Duration::from_millis(50)).await;

        assert!(ctl.stop());
        backend.hub.emit(BridgeEvent::Stopped);
        let ev = next(&mut rx).await;
        assert_eq!(ctl.handle(ev), Some(Notice::Stopped(StopReason::Confirmed)));

        let ev = next(&mut rx).await;
        assert!(matches!(ev, ControllerEvent::StopGraceElapsed { .. }));
        assert_eq!(ctl.handle(ev), None);
    }

    #[tokio::test]
    async fn test_failed_start_keeps_logs_and_returns_to_not_started() {
        let backend = ScriptedBackend::new(Err(BridgeError::StartFailed(
            "Error: Ngrok token not configured".into(),
        )));
        let (mut ctl, mut rx) = BridgeController::new(backend, Duration::from_millis(500));

        assert!(ctl.start());
        let ev = next(&mut rx).await;
        assert_eq!(
            ctl.handle(ev),
            Some(Notice::StartFailed("Error: Ngrok token not configured".into()))
        );
        assert_eq!(ctl.status(), BridgeStatus::NotStarted);
        assert_eq!(ctl.state().logs.len(), 1);
        assert_eq!(
            ctl.state().logs[0].message,
            "❌ Error: Ngrok token not configured"
        );
    }

    #[tokio::test]
    async fn test_stale_start_result_is_ignored() {
        let backend = ScriptedBackend::new(Ok("ok".into()));
        let (mut ctl, _rx) = BridgeController::new(backend, Duration::from_millis(500));
        assert!(ctl.start());

        let stale = ControllerEvent::StartFinished {
            run: 0,
            result: Ok("old".into()),
        };
        assert_eq!(ctl.handle(stale), None);
        assert_eq!(ctl.status(), BridgeStatus::Starting);
    }

    #[tokio::test]
    async fn test_logs_arrive_in_order_and_url_ignored_when_idle() {
        let backend = ScriptedBackend::new(Ok("ok".into()));
        let (mut ctl, mut rx) = BridgeController::new(backend.clone(), Duration::from_millis(500));

        backend.hub.emit(BridgeEvent::Log("one".into()));
        backend.hub.emit(BridgeEvent::Log("two".into()));
        backend
            .hub
            .emit(BridgeEvent::PublicUrl("https://early.ngrok.app".into()));
        for _ in 0..3 {
            let ev = next(&mut rx).await;
            ctl.handle(ev);
        }
        let messages: Vec<&str> = ctl.state().logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, vec!["one", "two"]);
        assert_eq!(ctl.state().public_url, None);
    }

    #[tokio::test]
    async fn test_unexpected_exit_while_running_finalizes() {
        let backend = ScriptedBackend::new(Ok("Bridge started successfully".into()));
        let (mut ctl, mut rx) = running(backend.clone(), Duration::from_millis(500)).await;

        backend.hub.emit(BridgeEvent::Stopped);
        let ev = next(&mut rx).await;
        assert_eq!(ctl.handle(ev), Some(Notice::Stopped(StopReason::Exited)));
        assert_eq!(ctl.status(), BridgeStatus::NotStarted);
    }

    #[tokio::test]
    async fn test_adopt_and_shutdown() {
        let backend = ScriptedBackend::new(Ok("ok".into()));
        let (mut ctl, _rx) = BridgeController::new(backend.clone(), Duration::from_millis(500));
        assert_eq!(backend.hub.listener_count(Topic::Log), 1);

        ctl.adopt_running();
        assert_eq!(ctl.status(), BridgeStatus::Running);

        ctl.shutdown();
        for topic in Topic::ALL {
            assert_eq!(backend.hub.listener_count(topic), 0);
        }
    }
}
