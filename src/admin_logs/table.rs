use serde_json::Value;

use super::channel::LogType;

pub const NO_LOGS_MESSAGE: &str = "No logs found.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCell {
    /// Known account: links to the admin user page.
    Link { href: String, username: String },
    /// A name without a usable account id.
    Name(String),
    Anonymous,
}

impl UserCell {
    fn from_entry(entry: &Value) -> Self {
        let Some(username) = non_empty_text(entry, "username") else {
            return Self::Anonymous;
        };
        match non_empty_text(entry, "user_id") {
            Some(user_id) if user_id != "anonymous" => Self::Link {
                href: format!("/admin/user/{user_id}"),
                username,
            },
            _ => Self::Name(username),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Link { username, .. } | Self::Name(username) => username,
            Self::Anonymous => "Anonymous",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBadge {
    Success,
    Failure,
}

impl StatusBadge {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Success => "bg-success",
            Self::Failure => "bg-danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLogRow {
    pub timestamp: String,
    pub user: UserCell,
    pub action: String,
    pub status: StatusBadge,
    pub request_path: String,
    /// Element id of the collapsible details block, `details{index}`.
    pub details_id: String,
    /// The whole entry, pretty-printed.
    pub details: String,
}

impl UserLogRow {
    fn from_entry(index: usize, entry: &Value) -> Self {
        let status = if entry.get("status").and_then(Value::as_str) == Some("success") {
            StatusBadge::Success
        } else {
            StatusBadge::Failure
        };
        Self {
            timestamp: text(entry, "timestamp"),
            user: UserCell::from_entry(entry),
            action: text(entry, "action"),
            status,
            request_path: text(entry, "request_path"),
            details_id: format!("details{index}"),
            details: serde_json::to_string_pretty(entry).unwrap_or_default(),
        }
    }
}

/// Rendered body of the logs table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTable {
    /// A single "No logs found." row.
    Empty,
    UserRows(Vec<UserLogRow>),
    /// One preformatted block per entry's `content`.
    RawBlocks(Vec<String>),
}

impl LogTable {
    pub fn render(log_type: &LogType, logs: &[Value]) -> Self {
        if logs.is_empty() {
            return Self::Empty;
        }
        if log_type.is_structured() {
            Self::UserRows(
                logs.iter()
                    .enumerate()
                    .map(|(index, entry)| UserLogRow::from_entry(index, entry))
                    .collect(),
            )
        } else {
            Self::RawBlocks(logs.iter().map(|entry| text(entry, "content")).collect())
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            Self::Empty => 1,
            Self::UserRows(rows) => rows.len(),
            Self::RawBlocks(blocks) => blocks.len(),
        }
    }
}

fn text(entry: &Value, field: &str) -> String {
    match entry.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(value)) => value.clone(),
        Some(other) => other.to_string(),
    }
}

fn non_empty_text(entry: &Value, field: &str) -> Option<String> {
    Some(text(entry, field)).filter(|value| !value.is_empty())
}
