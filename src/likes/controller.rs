use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, error, warn};

use super::api::LikesApi;
use super::button::LikeButton;
use super::cache::{cache_key, LikeStatusCache};
use super::dashboard::LikedDashboard;
use super::types::{ContentRef, ContentType, LikeStatusResponse};
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The server accepted the toggle; the button now shows this state.
    Applied { is_liked: bool, like_count: u64 },
    /// Unknown button, or a toggle for it is still in flight.
    Ignored,
    /// Transport error or `success: false`; nothing changed.
    Failed,
}

/// Like buttons on the current page and the calls that keep them in sync.
///
/// Buttons are keyed by content ref. Each one carries its own disabled flag,
/// so different buttons can toggle concurrently while a second click on a
/// busy button is ignored.
pub struct LikeController {
    api: Arc<dyn LikesApi>,
    cache: LikeStatusCache,
    buttons: DashMap<ContentRef, LikeButton>,
    counts: DashMap<ContentRef, u64>,
}

impl LikeController {
    pub fn new(api: Arc<dyn LikesApi>, cache_ttl: Duration) -> Self {
        Self {
            api,
            cache: LikeStatusCache::new(cache_ttl),
            buttons: DashMap::new(),
            counts: DashMap::new(),
        }
    }

    /// Register the page's buttons and load their state in one batched query.
    /// Returns false when nothing was applied.
    pub async fn initialize(&self, buttons: Vec<LikeButton>) -> bool {
        if buttons.is_empty() {
            return false;
        }
        let items: Vec<ContentRef> = buttons.iter().map(|b| b.item.clone()).collect();
        for button in buttons {
            self.buttons.insert(button.item.clone(), button);
        }

        let Some(status) = self.load_status(&items).await else {
            return false;
        };
        for item in &items {
            let Some(state) = status.item(item) else {
                continue;
            };
            if let Some(mut button) = self.buttons.get_mut(item) {
                button.set_state(state.is_liked, state.like_count);
            }
        }
        true
    }

    /// Counts-only refresh for pages without like buttons (signed-out visitors).
    /// The content type comes from the page path.
    pub async fn refresh_counts(&self, page_path: &str, ids: &[String]) -> bool {
        let content_type = ContentType::from_page_path(page_path);
        let items: Vec<ContentRef> = ids
            .iter()
            .filter(|id| !id.is_empty())
            .map(|id| ContentRef::new(content_type, id.as_str()))
            .collect();
        if items.is_empty() {
            return false;
        }

        let Some(status) = self.load_status(&items).await else {
            return false;
        };
        for item in items {
            if let Some(state) = status.item(&item) {
                self.counts.insert(item, state.like_count);
            }
        }
        true
    }

    /// Batched status through the cache.
    ///
    /// A response that arrives after a toggle cleared the cache is returned
    /// but not stored, since it may predate the toggle.
    pub async fn fetch_status(
        &self,
        items: &[ContentRef],
    ) -> Result<LikeStatusResponse, ClientError> {
        let key = cache_key(items);
        if let Some(cached) = self.cache.get(&key) {
            debug!("like status cache hit for {key}");
            return Ok(cached);
        }
        let generation = self.cache.generation();
        let response = self.api.fetch_status(items).await?;
        if !self.cache.insert_if_current(key, response.clone(), generation) {
            debug!("like status for {} items outdated by a toggle, not cached", items.len());
        }
        Ok(response)
    }

    pub async fn toggle(&self, item: &ContentRef) -> ToggleOutcome {
        {
            let Some(mut button) = self.buttons.get_mut(item) else {
                debug!("no like button registered for {item}");
                return ToggleOutcome::Ignored;
            };
            if button.disabled {
                return ToggleOutcome::Ignored;
            }
            button.disabled = true;
        }

        let outcome = self.send_toggle(item).await;

        if let Some(mut button) = self.buttons.get_mut(item) {
            if let ToggleOutcome::Applied {
                is_liked,
                like_count,
            } = outcome
            {
                button.set_state(is_liked, like_count);
            }
            button.disabled = false;
        }
        outcome
    }

    /// Unlike from the dashboard list. On success the item leaves the list;
    /// on failure the item and its counter stay.
    ///
    /// The dashboard is borrowed exclusively for the whole request, so a
    /// second unlike cannot start until this one has finished.
    pub async fn unlike(
        &self,
        dashboard: &mut LikedDashboard,
        item: &ContentRef,
    ) -> ToggleOutcome {
        if !dashboard.contains(item) {
            debug!("{item} is not on the dashboard");
            return ToggleOutcome::Ignored;
        }
        let outcome = self.send_toggle(item).await;
        if matches!(outcome, ToggleOutcome::Applied { .. }) {
            dashboard.remove(item);
        }
        outcome
    }

    pub fn button(&self, item: &ContentRef) -> Option<LikeButton> {
        self.buttons.get(item).map(|b| b.value().clone())
    }

    pub fn buttons(&self) -> Vec<LikeButton> {
        let mut buttons: Vec<LikeButton> = self.buttons.iter().map(|b| b.value().clone()).collect();
        buttons.sort_by(|a, b| a.item.cmp(&b.item));
        buttons
    }

    /// Displayed count for an item, from its button or a counts-only refresh.
    pub fn like_count(&self, item: &ContentRef) -> Option<u64> {
        self.buttons
            .get(item)
            .map(|b| b.like_count)
            .or_else(|| self.counts.get(item).map(|c| *c))
    }

    async fn load_status(&self, items: &[ContentRef]) -> Option<LikeStatusResponse> {
        match self.fetch_status(items).await {
            Ok(status) if status.success => Some(status),
            Ok(_) => {
                warn!("like status query for {} items was not successful", items.len());
                None
            }
            Err(e) => {
                error!("error fetching like status: {e}");
                None
            }
        }
    }

    async fn send_toggle(&self, item: &ContentRef) -> ToggleOutcome {
        match self.api.toggle(item).await {
            Ok(response) => {
                self.cache.clear();
                if response.success {
                    ToggleOutcome::Applied {
                        is_liked: response.is_liked,
                        like_count: response.like_count,
                    }
                } else {
                    warn!(
                        "like toggle on {item} rejected: {}",
                        response.message.as_deref().unwrap_or("no message")
                    );
                    ToggleOutcome::Failed
                }
            }
            Err(e) => {
                error!("error toggling like on {item}: {e}");
                ToggleOutcome::Failed
            }
        }
    }
}
