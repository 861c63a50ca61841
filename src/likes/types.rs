use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Article,
    Event,
    Publication,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Event => "event",
            Self::Publication => "publication",
        }
    }

    /// Listing pages carry no type on their cards, so the type is taken from
    /// the page path.
    pub fn from_page_path(path: &str) -> Self {
        if path.contains("events") {
            Self::Event
        } else if path.contains("publications") {
            Self::Publication
        } else {
            Self::Article
        }
    }

    /// Label of the dashboard stat counting liked items of this type.
    pub fn counter_label(&self) -> &'static str {
        match self {
            Self::Article => "Articles Liked",
            Self::Event => "Events Liked",
            Self::Publication => "Publications Liked",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "article" => Ok(Self::Article),
            "event" => Ok(Self::Event),
            "publication" => Ok(Self::Publication),
            other => Err(ClientError::InvalidContentRef(format!(
                "unknown content type '{other}'"
            ))),
        }
    }
}

/// A likeable item, written `type:id` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentRef {
    pub content_type: ContentType,
    pub id: String,
}

impl ContentRef {
    pub fn new(content_type: ContentType, id: impl Into<String>) -> Self {
        Self {
            content_type,
            id: id.into(),
        }
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.content_type, self.id)
    }
}

impl FromStr for ContentRef {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (content_type, id) = s
            .split_once(':')
            .ok_or_else(|| ClientError::InvalidContentRef(format!("expected type:id, got '{s}'")))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(ClientError::InvalidContentRef(format!("missing id in '{s}'")));
        }
        Ok(Self::new(content_type.trim().parse()?, id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatus {
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub is_liked: bool,
}

/// Body of `GET /api/likes/status`, keyed by `type:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeStatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub items: HashMap<String, ItemStatus>,
}

impl LikeStatusResponse {
    pub fn item(&self, item: &ContentRef) -> Option<&ItemStatus> {
        self.items.get(&item.to_string())
    }
}

/// Body of `POST /api/like/{type}/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
