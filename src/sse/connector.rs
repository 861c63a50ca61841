use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, COOKIE};
use tracing::{debug, info};

use super::event::{SseDecoder, SseError, SseEvent};
use crate::config::PortalConfig;
use crate::error::ClientError;

pub type SseStream = Pin<Box<dyn Stream<Item = Result<SseEvent, SseError>> + Send>>;

/// Opens server-push streams. The stream ends (`None`) when the server
/// closes the response.
#[async_trait]
pub trait EventStreamConnector: Send + Sync {
    async fn open(&self, path: &str) -> Result<SseStream, SseError>;
}

/// `reqwest` backed connector for the portal's SSE endpoints.
pub struct HttpEventStreamConnector {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl HttpEventStreamConnector {
    pub fn new(config: &PortalConfig) -> Result<Self, ClientError> {
        // No total timeout: streams stay open for as long as the server
        // keeps pushing.
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        if let Some(cookie) = &config.session_cookie {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(cookie)
                    .map_err(|e| ClientError::Config(format!("invalid session cookie: {e}")))?,
            );
        }

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            headers,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl EventStreamConnector for HttpEventStreamConnector {
    async fn open(&self, path: &str) -> Result<SseStream, SseError> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| SseError::Connection(format!("failed to connect to {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SseError::Http {
                status: status.as_u16(),
                message,
            });
        }

        info!("opened SSE stream at {}", url);
        Ok(decode_body(response.bytes_stream()))
    }
}

/// Turn a chunked response body into a stream of SSE events.
pub(crate) fn decode_body<S, B, E>(body: S) -> SseStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    struct State<S> {
        body: Pin<Box<S>>,
        decoder: SseDecoder,
        ready: VecDeque<SseEvent>,
        finished: bool,
    }

    let state = State {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                return Some((Ok(event), state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    debug!("decoded {} SSE events from chunk", events.len());
                    state.ready.extend(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(SseError::Stream(e.to_string())), state));
                }
                None => {
                    state.finished = true;
                    state.ready.extend(state.decoder.finish());
                }
            }
        }
    }))
}
