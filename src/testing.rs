//! Test doubles shared by the unit tests: a scripted SSE connector, an
//! in-memory likes backend and helpers for draining the event bus.

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, Stream, StreamExt};
use tokio::sync::broadcast;
use tokio::time::{timeout_at, Instant};

use crate::bus::BusEvent;
use crate::error::ClientError;
use crate::likes::{ContentRef, ItemStatus, LikeStatusResponse, LikesApi, ToggleResponse};
use crate::sse::{EventStreamConnector, SseError, SseEvent, SseStream};

// ---------------------------------------------------------------------------
// SSE
// ---------------------------------------------------------------------------

/// What the next `open` call does.
pub(crate) enum Script {
    Fail(SseError),
    /// Deliver the events, then end the stream.
    Events(Vec<SseEvent>),
    /// Deliver the events, then stay open forever.
    EventsThenHang(Vec<SseEvent>),
}

impl Script {
    pub(crate) fn fail() -> Self {
        Self::Fail(SseError::Connection("connection refused".to_string()))
    }
}

/// Plays back one script per `open`. Once the scripts run out every open fails.
pub(crate) struct ScriptedConnector {
    scripts: Mutex<VecDeque<Script>>,
    opened: Mutex<Vec<String>>,
    live: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub(crate) fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            opened: Mutex::new(Vec::new()),
            live: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub(crate) fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub(crate) fn opened_paths(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    /// Streams handed out and not yet dropped.
    pub(crate) fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStreamConnector for ScriptedConnector {
    async fn open(&self, path: &str) -> Result<SseStream, SseError> {
        self.opened.lock().unwrap().push(path.to_string());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(Script::fail);

        let inner: SseStream = match script {
            Script::Fail(e) => return Err(e),
            Script::Events(events) => Box::pin(stream::iter(events.into_iter().map(Ok))),
            Script::EventsThenHang(events) => Box::pin(
                stream::iter(events.into_iter().map(Ok)).chain(stream::pending()),
            ),
        };
        Ok(Box::pin(Tracked::new(inner, self.live.clone())))
    }
}

/// Counts itself in `live` for as long as it exists.
struct Tracked {
    inner: SseStream,
    live: Arc<AtomicUsize>,
}

impl Tracked {
    fn new(inner: SseStream, live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self { inner, live }
    }
}

impl Stream for Tracked {
    type Item = Result<SseEvent, SseError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Likes
// ---------------------------------------------------------------------------

/// In-memory like storage behaving like the portal's like endpoints.
#[derive(Default)]
pub(crate) struct FakeLikesBackend {
    items: Mutex<HashMap<String, ItemStatus>>,
    status_calls: AtomicUsize,
    toggle_calls: AtomicUsize,
    reject_toggles: AtomicBool,
    toggle_delay: Mutex<Option<Duration>>,
    status_delay: Mutex<Option<Duration>>,
}

impl FakeLikesBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn seed(&self, item: &str, like_count: u64, is_liked: bool) {
        self.items.lock().unwrap().insert(
            item.to_string(),
            ItemStatus {
                like_count,
                is_liked,
            },
        );
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn toggle_calls(&self) -> usize {
        self.toggle_calls.load(Ordering::SeqCst)
    }

    /// Answer toggles with `success: false`.
    pub(crate) fn reject_toggles(&self) {
        self.reject_toggles.store(true, Ordering::SeqCst);
    }

    pub(crate) fn delay_toggles(&self, delay: Duration) {
        *self.toggle_delay.lock().unwrap() = Some(delay);
    }

    /// Status queries read the stored state, then wait before answering.
    pub(crate) fn delay_status(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl LikesApi for FakeLikesBackend {
    async fn fetch_status(&self, items: &[ContentRef]) -> Result<LikeStatusResponse, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let items = {
            let stored = self.items.lock().unwrap();
            items
                .iter()
                .map(|item| {
                    let key = item.to_string();
                    let status = stored.get(&key).cloned().unwrap_or_default();
                    (key, status)
                })
                .collect()
        };
        let delay = *self.status_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(LikeStatusResponse {
            success: true,
            items,
        })
    }

    async fn toggle(&self, item: &ContentRef) -> Result<ToggleResponse, ClientError> {
        self.toggle_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.toggle_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject_toggles.load(Ordering::SeqCst) {
            return Ok(ToggleResponse {
                success: false,
                is_liked: false,
                like_count: 0,
                message: Some("rejected".to_string()),
            });
        }

        let mut stored = self.items.lock().unwrap();
        let status = stored.entry(item.to_string()).or_default();
        if status.is_liked {
            status.is_liked = false;
            status.like_count = status.like_count.saturating_sub(1);
        } else {
            status.is_liked = true;
            status.like_count += 1;
        }
        Ok(ToggleResponse {
            success: true,
            is_liked: status.is_liked,
            like_count: status.like_count,
            message: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Bus helpers
// ---------------------------------------------------------------------------

/// Receive events until `done` matches one (inclusive). Panics after 5 s.
pub(crate) async fn collect_until<F>(
    rx: &mut broadcast::Receiver<BusEvent>,
    mut done: F,
) -> Vec<BusEvent>
where
    F: FnMut(&BusEvent) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = Vec::new();
    loop {
        let event = match timeout_at(deadline, rx.recv()).await {
            Ok(Ok(event)) => event,
            Ok(Err(e)) => panic!("bus receive failed: {e}"),
            Err(_) => panic!(
                "timed out waiting for event, saw {:?}",
                seen.iter().map(BusEvent::name).collect::<Vec<_>>()
            ),
        };
        let finished = done(&event);
        seen.push(event);
        if finished {
            return seen;
        }
    }
}

/// Receive whatever arrives within `window`.
pub(crate) async fn collect_for(
    rx: &mut broadcast::Receiver<BusEvent>,
    window: Duration,
) -> Vec<BusEvent> {
    let deadline = Instant::now() + window;
    let mut seen = Vec::new();
    while let Ok(Ok(event)) = timeout_at(deadline, rx.recv()).await {
        seen.push(event);
    }
    seen
}
