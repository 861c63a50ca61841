//! Event names, categories and the typed event payload.
//!
//! Single source of truth for the names page scripts listen for
//! (`sse:connected`, `task:update`, ...).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::admin_logs::LogsResponse;
use crate::scores::ScoreUpdate;
use crate::tasks::TaskUpdate;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub const CATEGORY_SSE: &str = "sse";
pub const CATEGORY_TASK: &str = "task";
pub const CATEGORY_SCORE: &str = "score";
pub const CATEGORY_ADMIN: &str = "adminSocket";

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub const EVENT_SSE_CONNECTED: &str = "sse:connected";
pub const EVENT_SSE_DISCONNECTED: &str = "sse:disconnected";
pub const EVENT_SSE_MESSAGE: &str = "sse:message";
pub const EVENT_SSE_MAX_RECONNECT_ATTEMPTS: &str = "sse:max_reconnect_attempts";
pub const EVENT_TASK_CONNECTED: &str = "task:connected";
pub const EVENT_TASK_DISCONNECTED: &str = "task:disconnected";
pub const EVENT_TASK_UPDATE: &str = "task:update";
pub const EVENT_SCORE_CONNECTED: &str = "score:connected";
pub const EVENT_SCORE_DISCONNECTED: &str = "score:disconnected";
pub const EVENT_SCORE_UPDATE: &str = "score:update";
pub const EVENT_ADMIN_CONNECTED: &str = "adminSocket:connected";
pub const EVENT_ADMIN_LOGS_DATA: &str = "adminSocket:logs_data";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PortalEvent {
    SseConnected {
        url: String,
    },
    SseDisconnected {
        url: String,
    },
    SseMessage {
        payload: serde_json::Value,
    },
    /// The general stream gave up after `attempts` reconnects.
    SseMaxReconnectAttempts {
        url: String,
        attempts: u32,
    },
    TaskConnected {
        task_id: String,
    },
    TaskDisconnected {
        task_id: String,
    },
    TaskUpdate {
        task_id: String,
        update: TaskUpdate,
    },
    ScoreConnected {
        company_name: String,
    },
    ScoreDisconnected {
        company_name: String,
    },
    ScoreUpdate {
        company_name: String,
        update: ScoreUpdate,
    },
    AdminSocketConnected,
    AdminLogsData {
        data: LogsResponse,
    },
}

impl PortalEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SseConnected { .. } => EVENT_SSE_CONNECTED,
            Self::SseDisconnected { .. } => EVENT_SSE_DISCONNECTED,
            Self::SseMessage { .. } => EVENT_SSE_MESSAGE,
            Self::SseMaxReconnectAttempts { .. } => EVENT_SSE_MAX_RECONNECT_ATTEMPTS,
            Self::TaskConnected { .. } => EVENT_TASK_CONNECTED,
            Self::TaskDisconnected { .. } => EVENT_TASK_DISCONNECTED,
            Self::TaskUpdate { .. } => EVENT_TASK_UPDATE,
            Self::ScoreConnected { .. } => EVENT_SCORE_CONNECTED,
            Self::ScoreDisconnected { .. } => EVENT_SCORE_DISCONNECTED,
            Self::ScoreUpdate { .. } => EVENT_SCORE_UPDATE,
            Self::AdminSocketConnected => EVENT_ADMIN_CONNECTED,
            Self::AdminLogsData { .. } => EVENT_ADMIN_LOGS_DATA,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::SseConnected { .. }
            | Self::SseDisconnected { .. }
            | Self::SseMessage { .. }
            | Self::SseMaxReconnectAttempts { .. } => CATEGORY_SSE,
            Self::TaskConnected { .. }
            | Self::TaskDisconnected { .. }
            | Self::TaskUpdate { .. } => CATEGORY_TASK,
            Self::ScoreConnected { .. }
            | Self::ScoreDisconnected { .. }
            | Self::ScoreUpdate { .. } => CATEGORY_SCORE,
            Self::AdminSocketConnected | Self::AdminLogsData { .. } => CATEGORY_ADMIN,
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient payload fields
// ---------------------------------------------------------------------------

/// Stream payloads are free-form JSON. A field the page would only print must
/// not make the whole message undecodable.
fn value_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

/// Status field: missing or null gives the default, non-strings keep their
/// JSON text.
pub(crate) fn lenient_status<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String> + Default,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(value_text)
        .map(T::from)
        .unwrap_or_default())
}

pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_text))
}
