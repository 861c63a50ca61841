//! Server-Sent Events client.
//!
//! - `event`: SSE framing (field parsing and an incremental decoder)
//! - `connector`: the `EventStreamConnector` seam and its HTTP implementation
//! - `manager`: the general, task and score streams with their retry and
//!   close-on-terminal rules

mod connector;
mod event;
mod manager;

pub use connector::{EventStreamConnector, HttpEventStreamConnector, SseStream};
pub use event::{SseDecoder, SseError, SseEvent};
pub use manager::{
    score_stream_path, task_stream_path, ReconnectPolicy, SseManager, GENERAL_STREAM_PATH,
};
