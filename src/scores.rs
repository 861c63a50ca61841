//! ESG score stream payloads and the score board view.
//!
//! The board mirrors what the results page shows while provider scores
//! stream in: one cell per score source plus a status line under the search
//! form. A success message clears itself after [`STATUS_CLEAR_DELAY`].

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::bus::event_types::{lenient_status, lenient_text};
use crate::bus::{BusEvent, PortalEvent};

pub const STATUS_CLEAR_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScoreStatus {
    Fetching,
    Error,
    Success,
    Completed,
    Failed,
    Cancelled,
    Other(String),
}

impl ScoreStatus {
    /// Statuses after which the score stream is closed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Fetching => "fetching",
            Self::Error => "error",
            Self::Success => "success",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Other(value) => value,
        }
    }
}

impl Default for ScoreStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for ScoreStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "fetching" => Self::Fetching,
            "error" => Self::Error,
            "success" => Self::Success,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Other(value),
        }
    }
}

impl From<ScoreStatus> for String {
    fn from(value: ScoreStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ScoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: ScoreStatus,
    /// Providers report numbers or letter ratings, so this stays untyped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreCell {
    Loading,
    Error { message: Option<String> },
    Value(String),
}

impl ScoreCell {
    pub fn label(&self) -> &str {
        match self {
            Self::Loading => "Loading...",
            Self::Error { .. } => "Error",
            Self::Value(text) => text,
        }
    }

    /// Hover text for the error badge.
    pub fn tooltip(&self) -> Option<&str> {
        match self {
            Self::Error { message } => message.as_deref(),
            _ => None,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Error { .. } => "error",
            Self::Value(_) => "success",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Loading,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub tone: StatusTone,
    clears_at: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct ScoreBoard {
    company_name: Option<String>,
    connected: bool,
    cells: BTreeMap<String, ScoreCell>,
    status: Option<StatusLine>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A board that only accepts updates for one company.
    pub fn for_company(company_name: impl Into<String>) -> Self {
        Self {
            company_name: Some(company_name.into()),
            ..Self::default()
        }
    }

    pub fn apply(&mut self, event: &BusEvent) {
        self.apply_at(event, Instant::now());
    }

    pub fn apply_at(&mut self, event: &BusEvent, now: Instant) {
        match &event.event {
            PortalEvent::ScoreConnected { company_name } if self.accepts(company_name) => {
                self.connected = true;
            }
            PortalEvent::ScoreDisconnected { company_name } if self.accepts(company_name) => {
                self.connected = false;
            }
            PortalEvent::ScoreUpdate {
                company_name,
                update,
            } if self.accepts(company_name) => self.apply_update_at(update, now),
            _ => {}
        }
    }

    pub fn apply_update_at(&mut self, update: &ScoreUpdate, now: Instant) {
        let Some(source) = update.source.as_deref() else {
            return;
        };

        match update.status {
            ScoreStatus::Fetching => {
                self.cells.insert(source.to_string(), ScoreCell::Loading);
                self.status = Some(StatusLine {
                    text: format!("Fetching {source} score..."),
                    tone: StatusTone::Loading,
                    clears_at: None,
                });
            }
            ScoreStatus::Error => {
                let message = update.message.clone();
                self.status = Some(StatusLine {
                    text: format!(
                        "Error fetching {source} score: {}",
                        message.as_deref().unwrap_or_default()
                    ),
                    tone: StatusTone::Error,
                    clears_at: None,
                });
                self.cells
                    .insert(source.to_string(), ScoreCell::Error { message });
            }
            ScoreStatus::Success => {
                let text = update.score.as_ref().map(score_text).unwrap_or_default();
                self.cells.insert(source.to_string(), ScoreCell::Value(text));
                self.status = Some(StatusLine {
                    text: format!("{source} score updated successfully"),
                    tone: StatusTone::Success,
                    clears_at: Some(now + STATUS_CLEAR_DELAY),
                });
            }
            _ => {
                tracing::debug!("score update for {source} with status {}", update.status);
            }
        }
    }

    pub fn company_name(&self) -> Option<&str> {
        self.company_name.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn cell(&self, source: &str) -> Option<&ScoreCell> {
        self.cells.get(source)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &ScoreCell)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn status_line(&self) -> Option<&StatusLine> {
        self.status_line_at(Instant::now())
    }

    pub fn status_line_at(&self, now: Instant) -> Option<&StatusLine> {
        self.status
            .as_ref()
            .filter(|line| line.clears_at.map_or(true, |deadline| now < deadline))
    }

    fn accepts(&self, company_name: &str) -> bool {
        self.company_name
            .as_deref()
            .map_or(true, |expected| expected == company_name)
    }
}

fn score_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
