//! Event system for live page updates.
//!
//! The event bus provides:
//! - Publish-subscribe pattern for stream status and update events
//! - Typed payloads (`PortalEvent`) instead of ad-hoc DOM custom events
//! - A consumer loop helper so feature views can follow the bus
//!
//! # Architecture
//!
//! Events flow from producers → EventBus → consumers:
//! - `SseManager` publishes `sse:*`, `task:*` and `score:*` events
//! - the admin log channel publishes `adminSocket:*` events
//! - `ScoreBoard`, `TaskTracker` and `LogViewer` consume them

mod consumer;
mod event_bus;
pub mod event_types;

pub use consumer::spawn_consumer;
pub use event_bus::{BusEvent, EventBus};
pub use event_types::PortalEvent;
