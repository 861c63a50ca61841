//! Task progress payloads and the tracker that follows `task:update` events.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bus::event_types::lenient_status;
use crate::bus::{BusEvent, PortalEvent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Completed,
    Failed,
    Cancelled,
    Other(String),
}

impl TaskStatus {
    /// Completed, failed and cancelled tasks never produce further updates.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Other(value) => value,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message from `/sse/task/{taskId}`. Only `status` is interpreted; the
/// rest of the payload is kept as-is for the page to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: TaskStatus,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TaskUpdate {
    pub fn message(&self) -> Option<&str> {
        self.extra.get("message").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskProgress {
    pub connected: bool,
    pub last_update: Option<TaskUpdate>,
    pub updates_seen: usize,
}

impl TaskProgress {
    pub fn is_finished(&self) -> bool {
        self.last_update
            .as_ref()
            .is_some_and(|update| update.status.is_terminal())
    }
}

#[derive(Debug, Default)]
pub struct TaskTracker {
    tasks: HashMap<String, TaskProgress>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one bus event into the tracker. Non-task events are ignored.
    pub fn apply(&mut self, event: &BusEvent) {
        match &event.event {
            PortalEvent::TaskConnected { task_id } => {
                self.entry(task_id).connected = true;
            }
            PortalEvent::TaskDisconnected { task_id } => {
                self.entry(task_id).connected = false;
            }
            PortalEvent::TaskUpdate { task_id, update } => {
                let progress = self.entry(task_id);
                progress.updates_seen += 1;
                if update.status.is_terminal() {
                    progress.connected = false;
                }
                progress.last_update = Some(update.clone());
            }
            _ => {}
        }
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskProgress> {
        self.tasks.get(task_id)
    }

    pub fn is_finished(&self, task_id: &str) -> bool {
        self.get(task_id).is_some_and(TaskProgress::is_finished)
    }

    fn entry(&mut self, task_id: &str) -> &mut TaskProgress {
        self.tasks
            .entry(task_id.to_string())
            .or_insert_with(|| TaskProgress {
                connected: false,
                last_update: None,
                updates_seen: 0,
            })
    }
}
