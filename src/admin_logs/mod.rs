//! Admin log viewer.
//!
//! - `channel`: request/response messages and the `LogChannel` seam
//! - `table`: user-row and raw-block table rendering
//! - `pagination`: the first/last/current±1 pagination bar
//! - `viewer`: page state tying the three together

mod channel;
mod pagination;
mod table;
mod viewer;

pub use channel::{LogChannel, LogRequest, LogType, LogsResponse, MpscLogChannel};
pub use pagination::{build_pagination, PageItem};
pub use table::{LogTable, StatusBadge, UserCell, UserLogRow, NO_LOGS_MESSAGE};
pub use viewer::LogViewer;
