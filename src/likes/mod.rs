//! Like/unlike buttons.
//!
//! Page load batches every visible button into one status query, answered
//! through a short-lived cache. Each toggle is one POST; the button is
//! disabled while it runs and takes its new state from the response alone.

mod api;
mod button;
mod cache;
mod controller;
mod dashboard;
mod types;

pub use api::{HttpLikesApi, LikesApi};
pub use button::{ButtonStyle, LikeButton};
pub use cache::{cache_key, LikeStatusCache};
pub use controller::{LikeController, ToggleOutcome};
pub use dashboard::{LikedDashboard, LikedItem, EMPTY_DASHBOARD_MESSAGE};
pub use types::{ContentRef, ContentType, ItemStatus, LikeStatusResponse, ToggleResponse};
