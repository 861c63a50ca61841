// tests/common/mod.rs
//! Shared helpers for the portal integration tests.

pub mod portal_server;

pub use portal_server::{collect_until, config_for};
