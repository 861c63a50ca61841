/// One control in the pagination bar. `target` is the page a click requests;
/// `None` means the control is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Previous { target: Option<u32> },
    Page { number: u32, active: bool },
    Ellipsis,
    Next { target: Option<u32> },
}

impl PageItem {
    pub fn target(&self) -> Option<u32> {
        match *self {
            Self::Previous { target } | Self::Next { target } => target,
            Self::Page { number, active } => (!active).then_some(number),
            Self::Ellipsis => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Previous { .. } => "\u{ab}".to_string(),
            Self::Page { number, .. } => number.to_string(),
            Self::Ellipsis => "...".to_string(),
            Self::Next { .. } => "\u{bb}".to_string(),
        }
    }
}

/// First page, last page and the current page with one neighbour on each
/// side; an ellipsis stands in for the gap after page 1 and before the last
/// page. A single page (or none) needs no controls.
pub fn build_pagination(page: u32, total_pages: u32) -> Vec<PageItem> {
    if total_pages <= 1 {
        return Vec::new();
    }

    let mut items = Vec::with_capacity(9);
    items.push(PageItem::Previous {
        target: (page > 1).then(|| page - 1),
    });

    for i in 1..=total_pages {
        let near_current = i + 1 >= page && i <= page.saturating_add(1);
        if i == 1 || i == total_pages || near_current {
            items.push(PageItem::Page {
                number: i,
                active: i == page,
            });
        } else if i == 2 || i == total_pages - 1 {
            items.push(PageItem::Ellipsis);
        }
    }

    items.push(PageItem::Next {
        target: (page < total_pages).then(|| page + 1),
    });
    items
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn labels(items: &[PageItem]) -> Vec<String> {
        items.iter().map(PageItem::label).collect()
    }

    #[test]
    fn window_around_middle_page() {
        let items = build_pagination(5, 10);
        assert_eq!(
            labels(&items),
            vec!["\u{ab}", "1", "...", "4", "5", "6", "...", "10", "\u{bb}"]
        );
        assert_eq!(items[2], PageItem::Ellipsis);
        assert_eq!(items[6], PageItem::Ellipsis);
        assert_eq!(items[0].target(), Some(4));
        assert_eq!(items[8].target(), Some(6));
        assert_eq!(items[4].target(), None);
    }

    #[test]
    fn first_and_last_pages_disable_their_arrows() {
        let first = build_pagination(1, 10);
        assert_eq!(
            labels(&first),
            vec!["\u{ab}", "1", "2", "...", "10", "\u{bb}"]
        );
        assert_eq!(first[0], PageItem::Previous { target: None });

        let last = build_pagination(10, 10);
        assert_eq!(
            labels(&last),
            vec!["\u{ab}", "1", "...", "9", "10", "\u{bb}"]
        );
        assert_eq!(last[last.len() - 1], PageItem::Next { target: None });
    }

    #[test]
    fn small_totals() {
        assert!(build_pagination(1, 1).is_empty());
        assert!(build_pagination(1, 0).is_empty());
        assert_eq!(
            labels(&build_pagination(2, 3)),
            vec!["\u{ab}", "1", "2", "3", "\u{bb}"]
        );
    }
}
