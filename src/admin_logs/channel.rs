use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::bus::{EventBus, PortalEvent};
use crate::error::ClientError;

/// Log category shown by one tab of the admin logs page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogType {
    User,
    Error,
    Other(String),
}

impl LogType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Error => "error",
            Self::Other(value) => value,
        }
    }

    /// Only user logs have structured rows; every other category is raw text.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::User)
    }
}

impl Default for LogType {
    fn default() -> Self {
        Self::User
    }
}

impl From<String> for LogType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => Self::User,
            "error" => Self::Error,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for LogType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<LogType> for String {
    fn from(value: LogType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `request_logs` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRequest {
    #[serde(rename = "type")]
    pub log_type: LogType,
    pub page: u32,
    pub per_page: u32,
}

/// `logs_data` message. Entry shape depends on the requested type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: Vec<serde_json::Value>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}

/// Bidirectional admin channel: log requests go out, `adminSocket:*` events
/// come back on the bus.
pub trait LogChannel: Send + Sync {
    fn is_connected(&self) -> bool;

    fn request_logs(&self, request: LogRequest) -> Result<(), ClientError>;
}

/// In-process channel. Requests land on an mpsc receiver owned by whatever
/// serves them; responses are fed back through [`MpscLogChannel::deliver`].
pub struct MpscLogChannel {
    tx: mpsc::UnboundedSender<LogRequest>,
    bus: Arc<EventBus>,
    connected: AtomicBool,
}

impl MpscLogChannel {
    pub fn new(bus: Arc<EventBus>) -> (Self, mpsc::UnboundedReceiver<LogRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = Self {
            tx,
            bus,
            connected: AtomicBool::new(false),
        };
        (channel, rx)
    }

    pub fn mark_connected(&self) {
        self.connected.store(true, Ordering::SeqCst);
        info!("admin log channel connected");
        self.bus.emit(PortalEvent::AdminSocketConnected);
    }

    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
        info!("admin log channel disconnected");
    }

    pub fn deliver(&self, data: LogsResponse) {
        debug!(
            "delivering {} log entries (page {}/{})",
            data.logs.len(),
            data.page,
            data.total_pages
        );
        self.bus.emit(PortalEvent::AdminLogsData { data });
    }
}

impl LogChannel for MpscLogChannel {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.tx.is_closed()
    }

    fn request_logs(&self, request: LogRequest) -> Result<(), ClientError> {
        self.tx
            .send(request)
            .map_err(|e| ClientError::Channel(format!("log request not delivered: {e}")))
    }
}
