use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::connector::EventStreamConnector;
use super::event::{SseError, SseEvent};
use crate::bus::{EventBus, PortalEvent};
use crate::config::{PortalConfig, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY_MS};
use crate::scores::ScoreUpdate;
use crate::tasks::TaskUpdate;

pub const GENERAL_STREAM_PATH: &str = "/sse";

pub fn task_stream_path(task_id: &str) -> String {
    format!("/sse/task/{task_id}")
}

pub fn score_stream_path(company_name: &str) -> String {
    format!(
        "/esg-scores/stream-scores/{}",
        urlencoding::encode(company_name)
    )
}

/// Fixed-delay retry policy for the general stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
        }
    }
}

impl From<&PortalConfig> for ReconnectPolicy {
    fn from(config: &PortalConfig) -> Self {
        Self {
            max_attempts: config.max_reconnect_attempts,
            delay: config.reconnect_delay,
        }
    }
}

/// A running stream task. Dropping the handle closes the stream.
struct StreamHandle {
    label: String,
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    fn is_connected(&self) -> bool {
        !self.task.is_finished() && self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        if !self.task.is_finished() {
            debug!("closing SSE stream {}", self.label);
        }
        self.task.abort();
    }
}

/// Owns the page's live streams: at most one general, one task and one
/// score stream. Opening a stream on an occupied channel closes the previous
/// one first.
///
/// The `connect_*` methods spawn onto the current tokio runtime.
pub struct SseManager {
    connector: Arc<dyn EventStreamConnector>,
    bus: Arc<EventBus>,
    policy: ReconnectPolicy,
    general: Mutex<Option<StreamHandle>>,
    task: Mutex<Option<StreamHandle>>,
    score: Mutex<Option<StreamHandle>>,
}

impl SseManager {
    pub fn new(
        connector: Arc<dyn EventStreamConnector>,
        bus: Arc<EventBus>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            connector,
            bus,
            policy,
            general: Mutex::new(None),
            task: Mutex::new(None),
            score: Mutex::new(None),
        }
    }

    /// Open the general `/sse` stream with bounded reconnects.
    pub fn connect_general(&self) {
        self.connect_general_at(GENERAL_STREAM_PATH);
    }

    pub fn connect_general_at(&self, path: &str) {
        let path = path.to_string();
        let connector = self.connector.clone();
        let bus = self.bus.clone();
        let policy = self.policy.clone();
        install(&self.general, format!("general {path}"), move |connected| {
            tokio::spawn(run_general(connector, bus, path, policy, connected))
        });
    }

    /// Open the progress stream for one task. Closes on error or terminal status.
    pub fn connect_task(&self, task_id: &str) {
        self.connect_scoped(&self.task, Scope::Task(task_id.to_string()));
    }

    /// Open the score stream for one company. Closes on error or terminal status.
    pub fn connect_score(&self, company_name: &str) {
        self.connect_scoped(&self.score, Scope::Score(company_name.to_string()));
    }

    pub fn is_connected(&self) -> bool {
        slot_connected(&self.general)
    }

    pub fn is_task_connected(&self) -> bool {
        slot_connected(&self.task)
    }

    pub fn is_score_connected(&self) -> bool {
        slot_connected(&self.score)
    }

    pub fn close_general(&self) {
        close_slot(&self.general);
    }

    pub fn close_task(&self) {
        close_slot(&self.task);
    }

    pub fn close_score(&self) {
        close_slot(&self.score);
    }

    pub fn close_all(&self) {
        self.close_general();
        self.close_task();
        self.close_score();
    }

    fn connect_scoped(&self, slot: &Mutex<Option<StreamHandle>>, scope: Scope) {
        let connector = self.connector.clone();
        let bus = self.bus.clone();
        install(slot, scope.label(), move |connected| {
            tokio::spawn(run_scoped(connector, bus, scope, connected))
        });
    }
}

fn install<F>(slot: &Mutex<Option<StreamHandle>>, label: String, spawn: F)
where
    F: FnOnce(Arc<AtomicBool>) -> JoinHandle<()>,
{
    let mut guard = slot.lock().expect("sse slot mutex poisoned");
    // The previous stream must be gone before the new one can deliver.
    drop(guard.take());
    let connected = Arc::new(AtomicBool::new(false));
    let task = spawn(connected.clone());
    *guard = Some(StreamHandle {
        label,
        connected,
        task,
    });
}

fn close_slot(slot: &Mutex<Option<StreamHandle>>) {
    let previous = slot.lock().expect("sse slot mutex poisoned").take();
    drop(previous);
}

fn slot_connected(slot: &Mutex<Option<StreamHandle>>) -> bool {
    slot.lock()
        .expect("sse slot mutex poisoned")
        .as_ref()
        .is_some_and(StreamHandle::is_connected)
}

async fn run_general(
    connector: Arc<dyn EventStreamConnector>,
    bus: Arc<EventBus>,
    path: String,
    policy: ReconnectPolicy,
    connected: Arc<AtomicBool>,
) {
    let mut attempts: u32 = 0;

    loop {
        let failure = match connector.open(&path).await {
            Ok(mut stream) => {
                info!("connected to SSE server at {path}");
                connected.store(true, Ordering::SeqCst);
                attempts = 0;
                bus.emit(PortalEvent::SseConnected { url: path.clone() });

                loop {
                    match stream.next().await {
                        Some(Ok(event)) => publish_message(&bus, &path, &event),
                        Some(Err(e)) => break e,
                        None => break SseError::Closed,
                    }
                }
            }
            Err(e) => e,
        };

        error!("SSE connection error on {path}: {failure}");
        connected.store(false, Ordering::SeqCst);

        let exhausted = attempts >= policy.max_attempts;
        if exhausted {
            error!("max reconnection attempts reached for {path}");
            bus.emit(PortalEvent::SseMaxReconnectAttempts {
                url: path.clone(),
                attempts,
            });
        }
        bus.emit(PortalEvent::SseDisconnected { url: path.clone() });
        if exhausted {
            return;
        }

        attempts += 1;
        info!(
            "attempting to reconnect ({attempts}/{}) in {:?}",
            policy.max_attempts, policy.delay
        );
        sleep(policy.delay).await;
    }
}

fn publish_message(bus: &EventBus, path: &str, event: &SseEvent) {
    if !event.is_message() {
        debug!("ignoring '{}' event on {path}", event.event_type);
        return;
    }
    match serde_json::from_str::<serde_json::Value>(&event.data) {
        Ok(payload) => {
            bus.emit(PortalEvent::SseMessage { payload });
        }
        Err(e) => warn!("error parsing SSE message on {path}: {e}"),
    }
}

/// Per-item streams: one task's progress or one company's scores.
#[derive(Debug, Clone)]
enum Scope {
    Task(String),
    Score(String),
}

impl Scope {
    fn path(&self) -> String {
        match self {
            Self::Task(task_id) => task_stream_path(task_id),
            Self::Score(company_name) => score_stream_path(company_name),
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Task(task_id) => format!("task {task_id}"),
            Self::Score(company_name) => format!("score {company_name}"),
        }
    }

    fn connected_event(&self) -> PortalEvent {
        match self {
            Self::Task(task_id) => PortalEvent::TaskConnected {
                task_id: task_id.clone(),
            },
            Self::Score(company_name) => PortalEvent::ScoreConnected {
                company_name: company_name.clone(),
            },
        }
    }

    fn disconnected_event(&self) -> PortalEvent {
        match self {
            Self::Task(task_id) => PortalEvent::TaskDisconnected {
                task_id: task_id.clone(),
            },
            Self::Score(company_name) => PortalEvent::ScoreDisconnected {
                company_name: company_name.clone(),
            },
        }
    }

    /// Decode one message into its update event, flagging terminal statuses.
    fn update_event(&self, data: &str) -> Result<(PortalEvent, bool), serde_json::Error> {
        match self {
            Self::Task(task_id) => {
                let update: TaskUpdate = serde_json::from_str(data)?;
                let terminal = update.status.is_terminal();
                Ok((
                    PortalEvent::TaskUpdate {
                        task_id: task_id.clone(),
                        update,
                    },
                    terminal,
                ))
            }
            Self::Score(company_name) => {
                let update: ScoreUpdate = serde_json::from_str(data)?;
                let terminal = update.status.is_terminal();
                Ok((
                    PortalEvent::ScoreUpdate {
                        company_name: company_name.clone(),
                        update,
                    },
                    terminal,
                ))
            }
        }
    }
}

async fn run_scoped(
    connector: Arc<dyn EventStreamConnector>,
    bus: Arc<EventBus>,
    scope: Scope,
    connected: Arc<AtomicBool>,
) {
    let label = scope.label();
    let mut stream = match connector.open(&scope.path()).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("{label} SSE connection error: {e}");
            bus.emit(scope.disconnected_event());
            return;
        }
    };

    info!("connected to {label} SSE");
    connected.store(true, Ordering::SeqCst);
    bus.emit(scope.connected_event());

    let failure = loop {
        match stream.next().await {
            Some(Ok(event)) => {
                if !event.is_message() {
                    continue;
                }
                match scope.update_event(&event.data) {
                    Ok((update, terminal)) => {
                        bus.emit(update);
                        if terminal {
                            info!("{label} reached a terminal status, closing SSE connection");
                            break None;
                        }
                    }
                    Err(e) => warn!("error parsing {label} SSE message: {e}"),
                }
            }
            Some(Err(e)) => break Some(e),
            None => break Some(SseError::Closed),
        }
    };

    connected.store(false, Ordering::SeqCst);
    if let Some(e) = failure {
        error!("{label} SSE connection error: {e}");
        bus.emit(scope.disconnected_event());
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::bus::BusEvent;
    use crate::testing::{collect_for, collect_until, Script, ScriptedConnector};

    fn fast_policy() -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(1),
        }
    }

    fn message(value: serde_json::Value) -> SseEvent {
        SseEvent::message(value.to_string())
    }

    fn count(events: &[BusEvent], name: &str) -> usize {
        events.iter().filter(|e| e.name() == name).count()
    }

    fn manager(connector: &Arc<ScriptedConnector>) -> (SseManager, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new());
        let manager = SseManager::new(connector.clone(), bus.clone(), fast_policy());
        (manager, bus)
    }

    #[test]
    fn score_path_is_percent_encoded() {
        assert_eq!(
            score_stream_path("Acme & Sons"),
            "/esg-scores/stream-scores/Acme%20%26%20Sons"
        );
        assert_eq!(task_stream_path("abc-1"), "/sse/task/abc-1");
    }

    #[tokio::test]
    async fn general_stream_gives_up_after_five_reconnects() {
        let connector = ScriptedConnector::new(Vec::new());
        let (manager, bus) = manager(&connector);
        let mut rx = bus.subscribe();

        manager.connect_general();
        let mut events = collect_until(&mut rx, |e| {
            matches!(e.event, PortalEvent::SseMaxReconnectAttempts { .. })
        })
        .await;
        events.extend(collect_for(&mut rx, Duration::from_millis(50)).await);

        assert_eq!(connector.open_count(), 6);
        assert_eq!(count(&events, "sse:disconnected"), 6);
        assert_eq!(count(&events, "sse:max_reconnect_attempts"), 1);
        assert!(events.iter().any(|e| e.event
            == PortalEvent::SseMaxReconnectAttempts {
                url: "/sse".into(),
                attempts: 5
            }));
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn successful_open_resets_the_reconnect_counter() {
        let connector = ScriptedConnector::new(vec![
            Script::fail(),
            Script::fail(),
            Script::Events(vec![message(json!({"kind": "news"}))]),
        ]);
        let (manager, bus) = manager(&connector);
        let mut rx = bus.subscribe();

        manager.connect_general();
        let events = collect_until(&mut rx, |e| {
            matches!(e.event, PortalEvent::SseMaxReconnectAttempts { .. })
        })
        .await;

        // 2 failures, 1 good connection that ends, then 5 more failures.
        assert_eq!(connector.open_count(), 8);
        assert_eq!(count(&events, "sse:connected"), 1);
        assert_eq!(count(&events, "sse:message"), 1);
    }

    #[tokio::test]
    async fn malformed_json_is_skipped() {
        let connector = ScriptedConnector::new(vec![Script::EventsThenHang(vec![
            SseEvent::message("not json"),
            message(json!({"kind": "news", "id": 7})),
        ])]);
        let (manager, bus) = manager(&connector);
        let mut rx = bus.subscribe();

        manager.connect_general();
        let mut events =
            collect_until(&mut rx, |e| matches!(e.event, PortalEvent::SseMessage { .. })).await;
        events.extend(collect_for(&mut rx, Duration::from_millis(30)).await);

        assert_eq!(count(&events, "sse:message"), 1);
        assert_eq!(count(&events, "sse:disconnected"), 0);
        assert!(manager.is_connected());

        manager.close_general();
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn task_stream_closes_after_terminal_status() {
        let connector = ScriptedConnector::new(vec![Script::EventsThenHang(vec![
            message(json!({"status": "running", "progress": 50})),
            message(json!({"status": "completed"})),
            message(json!({"status": "running"})),
        ])]);
        let (manager, bus) = manager(&connector);
        let mut rx = bus.subscribe();

        manager.connect_task("t-9");
        let mut events = collect_until(&mut rx, |e| match &e.event {
            PortalEvent::TaskUpdate { update, .. } => update.status.is_terminal(),
            _ => false,
        })
        .await;
        events.extend(collect_for(&mut rx, Duration::from_millis(30)).await);

        assert_eq!(count(&events, "task:connected"), 1);
        assert_eq!(count(&events, "task:update"), 2);
        assert_eq!(count(&events, "task:disconnected"), 0);
        assert_eq!(connector.opened_paths(), vec!["/sse/task/t-9".to_string()]);
        assert_eq!(connector.live_streams(), 0);
        assert!(!manager.is_task_connected());
    }

    #[tokio::test]
    async fn null_status_messages_are_still_published() {
        let connector = ScriptedConnector::new(vec![
            Script::EventsThenHang(vec![message(json!({"status": null, "progress": 5}))]),
            Script::EventsThenHang(vec![message(
                json!({"source": "cdp", "status": null, "score": 61}),
            )]),
        ]);
        let (manager, bus) = manager(&connector);
        let mut rx = bus.subscribe();

        manager.connect_task("t-2");
        let task = collect_until(&mut rx, |e| e.name() == "task:update").await;
        manager.connect_score("Acme");
        let score = collect_until(&mut rx, |e| e.name() == "score:update").await;

        match &task.last().unwrap().event {
            PortalEvent::TaskUpdate { update, .. } => {
                assert_eq!(update.extra["progress"], 5);
                assert!(!update.status.is_terminal());
            }
            other => panic!("expected task update, got {other:?}"),
        }
        match &score.last().unwrap().event {
            PortalEvent::ScoreUpdate { update, .. } => {
                assert_eq!(update.source.as_deref(), Some("cdp"));
                assert_eq!(update.score, Some(json!(61)));
            }
            other => panic!("expected score update, got {other:?}"),
        }
        assert!(manager.is_task_connected());
        assert!(manager.is_score_connected());
    }

    #[tokio::test]
    async fn task_stream_error_closes_without_retry() {
        let connector = ScriptedConnector::new(vec![Script::fail()]);
        let (manager, bus) = manager(&connector);
        let mut rx = bus.subscribe();

        manager.connect_task("t-1");
        let mut events = collect_until(&mut rx, |e| e.name() == "task:disconnected").await;
        events.extend(collect_for(&mut rx, Duration::from_millis(30)).await);

        assert_eq!(connector.open_count(), 1);
        assert_eq!(count(&events, "task:disconnected"), 1);
    }

    #[tokio::test]
    async fn score_stream_ending_reports_disconnect_once() {
        let connector = ScriptedConnector::new(vec![Script::Events(vec![message(
            json!({"source": "msci", "status": "fetching"}),
        )])]);
        let (manager, bus) = manager(&connector);
        let mut rx = bus.subscribe();

        manager.connect_score("Acme Corp");
        let mut events = collect_until(&mut rx, |e| e.name() == "score:disconnected").await;
        events.extend(collect_for(&mut rx, Duration::from_millis(30)).await);

        assert_eq!(
            connector.opened_paths(),
            vec!["/esg-scores/stream-scores/Acme%20Corp".to_string()]
        );
        let names: Vec<_> = events.iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["score:connected", "score:update", "score:disconnected"]
        );
    }

    #[tokio::test]
    async fn score_stream_closes_on_terminal_status() {
        let connector = ScriptedConnector::new(vec![Script::EventsThenHang(vec![
            message(json!({"source": "msci", "status": "success", "score": "AA"})),
            message(json!({"status": "completed"})),
        ])]);
        let (manager, bus) = manager(&connector);
        let mut rx = bus.subscribe();

        manager.connect_score("Acme");
        let mut events = collect_until(&mut rx, |e| match &e.event {
            PortalEvent::ScoreUpdate { update, .. } => update.status.is_terminal(),
            _ => false,
        })
        .await;
        events.extend(collect_for(&mut rx, Duration::from_millis(30)).await);

        assert_eq!(count(&events, "score:update"), 2);
        assert_eq!(count(&events, "score:disconnected"), 0);
        assert_eq!(connector.live_streams(), 0);
    }

    #[tokio::test]
    async fn replacing_a_stream_closes_the_previous_one() {
        let connector = ScriptedConnector::new(vec![
            Script::EventsThenHang(Vec::new()),
            Script::EventsThenHang(Vec::new()),
        ]);
        let (manager, bus) = manager(&connector);
        let mut rx = bus.subscribe();

        manager.connect_score("Acme");
        collect_until(&mut rx, |e| e.name() == "score:connected").await;
        manager.connect_score("Globex");
        collect_until(&mut rx, |e| {
            e.event
                == PortalEvent::ScoreConnected {
                    company_name: "Globex".into(),
                }
        })
        .await;
        collect_for(&mut rx, Duration::from_millis(20)).await;

        assert_eq!(connector.live_streams(), 1);
        assert!(manager.is_score_connected());

        manager.close_all();
        collect_for(&mut rx, Duration::from_millis(20)).await;
        assert_eq!(connector.live_streams(), 0);
        assert!(!manager.is_score_connected());
    }
}
