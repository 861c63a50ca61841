use std::collections::BTreeMap;

use super::types::{ContentRef, ContentType};

pub const EMPTY_DASHBOARD_MESSAGE: &str = "You haven't liked any content yet. Browse articles, events, and publications and click the heart icon to like them.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikedItem {
    pub item: ContentRef,
    pub title: String,
}

/// The "my likes" dashboard: liked items grouped by content type plus the
/// per-type "<Type>s Liked" counters.
///
/// `LikeController::unlike` holds `&mut LikedDashboard` until the server
/// answers, which keeps a second unlike from starting in the meantime.
#[derive(Debug, Default)]
pub struct LikedDashboard {
    sections: BTreeMap<ContentType, Vec<LikedItem>>,
    counters: BTreeMap<ContentType, u64>,
}

impl LikedDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of liked items; counters start at each section's size.
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = LikedItem>,
    {
        let mut dashboard = Self::new();
        for item in items {
            let content_type = item.item.content_type;
            dashboard.sections.entry(content_type).or_default().push(item);
            *dashboard.counters.entry(content_type).or_default() += 1;
        }
        dashboard
    }

    /// Override a counter with the server-rendered total, which may exceed the
    /// number of items listed.
    pub fn set_counter(&mut self, content_type: ContentType, value: u64) {
        self.counters.insert(content_type, value);
    }

    pub fn counter(&self, content_type: ContentType) -> Option<u64> {
        self.counters.get(&content_type).copied()
    }

    pub fn section(&self, content_type: ContentType) -> Option<&[LikedItem]> {
        self.sections.get(&content_type).map(Vec::as_slice)
    }

    pub fn sections(&self) -> impl Iterator<Item = (ContentType, &[LikedItem])> {
        self.sections.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn contains(&self, item: &ContentRef) -> bool {
        self.sections
            .get(&item.content_type)
            .is_some_and(|items| items.iter().any(|liked| &liked.item == item))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        self.is_empty().then_some(EMPTY_DASHBOARD_MESSAGE)
    }

    /// Remove an unliked item, decrement its counter and drop the section once
    /// it is empty.
    pub fn remove(&mut self, item: &ContentRef) -> bool {
        let Some(items) = self.sections.get_mut(&item.content_type) else {
            return false;
        };
        let before = items.len();
        items.retain(|liked| &liked.item != item);
        if items.len() == before {
            return false;
        }
        if items.is_empty() {
            self.sections.remove(&item.content_type);
        }
        if let Some(counter) = self.counters.get_mut(&item.content_type) {
            *counter = counter.saturating_sub(1);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn liked(content_type: ContentType, id: &str) -> LikedItem {
        LikedItem {
            item: ContentRef::new(content_type, id),
            title: format!("{content_type} {id}"),
        }
    }

    #[test]
    fn removing_items_updates_counters_and_sections() {
        let mut dashboard = LikedDashboard::from_items(vec![
            liked(ContentType::Article, "1"),
            liked(ContentType::Article, "2"),
            liked(ContentType::Event, "5"),
        ]);
        dashboard.set_counter(ContentType::Article, 12);

        assert!(dashboard.remove(&ContentRef::new(ContentType::Article, "1")));
        assert_eq!(dashboard.counter(ContentType::Article), Some(11));
        assert_eq!(dashboard.section(ContentType::Article).unwrap().len(), 1);

        assert!(dashboard.remove(&ContentRef::new(ContentType::Event, "5")));
        assert_eq!(dashboard.counter(ContentType::Event), Some(0));
        assert!(dashboard.section(ContentType::Event).is_none());
        assert_eq!(dashboard.empty_message(), None);
    }

    #[test]
    fn last_removal_shows_empty_state() {
        let item = ContentRef::new(ContentType::Publication, "3");
        let mut dashboard = LikedDashboard::from_items(vec![liked(ContentType::Publication, "3")]);

        assert!(dashboard.remove(&item));
        assert!(!dashboard.remove(&item));
        assert!(dashboard.is_empty());
        assert_eq!(dashboard.empty_message(), Some(EMPTY_DASHBOARD_MESSAGE));
        assert_eq!(ContentType::Publication.counter_label(), "Publications Liked");
    }

    #[test]
    fn contains_matches_type_and_id() {
        let dashboard = LikedDashboard::from_items(vec![liked(ContentType::Article, "1")]);

        assert!(dashboard.contains(&ContentRef::new(ContentType::Article, "1")));
        assert!(!dashboard.contains(&ContentRef::new(ContentType::Event, "1")));
        assert!(!dashboard.contains(&ContentRef::new(ContentType::Article, "99")));
    }
}
