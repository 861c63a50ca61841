use super::types::ContentRef;

/// The two button layouts the portal templates use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonStyle {
    /// Heart icon with a count, used on cards.
    #[default]
    Compact,
    /// Bordered detail-page button with a "Like"/"Liked" label.
    Outline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeButton {
    pub item: ContentRef,
    pub like_count: u64,
    pub is_liked: bool,
    pub disabled: bool,
    pub style: ButtonStyle,
}

impl LikeButton {
    pub fn new(item: ContentRef, style: ButtonStyle) -> Self {
        Self {
            item,
            like_count: 0,
            is_liked: false,
            disabled: false,
            style,
        }
    }

    pub fn set_state(&mut self, is_liked: bool, like_count: u64) {
        self.is_liked = is_liked;
        self.like_count = like_count;
    }

    pub fn classes(&self) -> Vec<&'static str> {
        let mut classes = vec!["like-btn"];
        if self.is_liked {
            classes.extend(["liked", "text-danger"]);
        }
        if self.style == ButtonStyle::Outline {
            classes.push(if self.is_liked {
                "btn-danger"
            } else {
                "btn-outline-danger"
            });
        }
        classes
    }

    pub fn icon_class(&self) -> &'static str {
        if self.is_liked {
            "fas"
        } else {
            "far"
        }
    }

    /// Text label; compact buttons only show the count.
    pub fn label(&self) -> Option<&'static str> {
        match (self.style, self.is_liked) {
            (ButtonStyle::Outline, true) => Some("Liked"),
            (ButtonStyle::Outline, false) => Some("Like"),
            (ButtonStyle::Compact, _) => None,
        }
    }
}
