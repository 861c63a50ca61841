//! ESG portal client library.
//!
//! A headless rendition of the portal's interaction layer. It handles:
//! - Live updates over Server-Sent Events (general, task and score streams)
//! - Like/unlike buttons with batched status queries and a short-lived cache
//! - The admin log viewer (table rendering and server-side pagination)
//!
//! # Architecture
//!
//! - `session`: `PortalSession`, owner of everything below for one page visit
//! - `sse`: stream connector, framing and the reconnecting stream manager
//! - `bus`: event bus carrying typed `PortalEvent`s to consumers
//! - `scores` / `tasks`: consumers of score and task updates
//! - `likes`: like buttons, dashboard and the like endpoints
//! - `admin_logs`: admin log channel and viewer state
//! - `config` / `error`: environment configuration and the shared error type

pub mod admin_logs;
pub mod bus;
pub mod config;
pub mod error;
pub mod likes;
pub mod scores;
pub mod session;
pub mod sse;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use bus::{BusEvent, EventBus, PortalEvent};
pub use config::PortalConfig;
pub use error::ClientError;
pub use session::PortalSession;
