use std::sync::Arc;

use tracing::{debug, error, warn};

use super::channel::{LogChannel, LogRequest, LogType, LogsResponse};
use super::pagination::{build_pagination, PageItem};
use super::table::LogTable;
use crate::bus::{BusEvent, PortalEvent};

/// View state of the admin logs page: selected category, current page and
/// the rendered table and pagination bar. Paging is server-side; every page
/// change is a new request and the view updates when `logs_data` arrives.
pub struct LogViewer {
    channel: Arc<dyn LogChannel>,
    per_page: u32,
    log_type: LogType,
    page: u32,
    total_pages: u32,
    table: Option<LogTable>,
    pagination: Vec<PageItem>,
}

impl LogViewer {
    pub fn new(channel: Arc<dyn LogChannel>, log_type: LogType, per_page: u32) -> Self {
        Self {
            channel,
            per_page,
            log_type,
            page: 1,
            total_pages: 1,
            table: None,
            pagination: Vec::new(),
        }
    }

    /// Request the current page if the channel is already up. Otherwise the
    /// first request goes out on `adminSocket:connected`.
    pub fn start(&self) -> bool {
        if self.channel.is_connected() {
            self.request(self.page)
        } else {
            false
        }
    }

    pub fn on_connected(&self) -> bool {
        self.request(self.page)
    }

    pub fn on_logs_data(&mut self, data: &LogsResponse) {
        self.page = data.page;
        self.total_pages = data.total_pages;
        self.table = Some(LogTable::render(&self.log_type, &data.logs));
        self.pagination = build_pagination(self.page, self.total_pages);
        debug!(
            "rendered {} {} log entries, page {}/{}",
            data.logs.len(),
            self.log_type,
            self.page,
            self.total_pages
        );
    }

    /// Switch tabs. Always starts from page 1.
    pub fn select_category(&mut self, log_type: LogType) -> bool {
        self.log_type = log_type;
        self.page = 1;
        self.request(1)
    }

    /// Follow a pagination link. Only enabled controls have a target, so
    /// pages outside `1..=total_pages` and the active page are ignored.
    pub fn go_to_page(&self, page: u32) -> bool {
        let enabled = self
            .pagination
            .iter()
            .any(|item| item.target() == Some(page));
        if !enabled {
            debug!("ignoring request for page {page}");
            return false;
        }
        self.request(page)
    }

    pub fn apply(&mut self, event: &BusEvent) {
        match &event.event {
            PortalEvent::AdminSocketConnected => {
                self.on_connected();
            }
            PortalEvent::AdminLogsData { data } => self.on_logs_data(data),
            _ => {}
        }
    }

    pub fn log_type(&self) -> &LogType {
        &self.log_type
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn table(&self) -> Option<&LogTable> {
        self.table.as_ref()
    }

    pub fn pagination(&self) -> &[PageItem] {
        &self.pagination
    }

    fn request(&self, page: u32) -> bool {
        if !self.channel.is_connected() {
            warn!("admin log channel not connected, dropping request for page {page}");
            return false;
        }
        let request = LogRequest {
            log_type: self.log_type.clone(),
            page,
            per_page: self.per_page,
        };
        match self.channel.request_logs(request) {
            Ok(()) => true,
            Err(e) => {
                error!("failed to request logs: {e}");
                false
            }
        }
    }
}
