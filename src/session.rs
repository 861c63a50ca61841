use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::admin_logs::{LogChannel, LogType, LogViewer};
use crate::bus::{BusEvent, EventBus};
use crate::config::PortalConfig;
use crate::error::ClientError;
use crate::likes::{HttpLikesApi, LikeController, LikesApi};
use crate::sse::{EventStreamConnector, HttpEventStreamConnector, ReconnectPolicy, SseManager};

/// Everything one page visit needs: config, event bus, live streams and like
/// buttons. Disposing (or dropping) the session closes every stream.
pub struct PortalSession {
    config: PortalConfig,
    bus: Arc<EventBus>,
    sse: SseManager,
    likes: LikeController,
}

impl PortalSession {
    /// Session talking to the portal over HTTP.
    pub fn new(config: PortalConfig) -> Result<Self, ClientError> {
        let connector = Arc::new(HttpEventStreamConnector::new(&config)?);
        let api = Arc::new(HttpLikesApi::new(&config)?);
        Ok(Self::with_parts(config, connector, api))
    }

    pub fn with_parts(
        config: PortalConfig,
        connector: Arc<dyn EventStreamConnector>,
        api: Arc<dyn LikesApi>,
    ) -> Self {
        let bus = Arc::new(EventBus::new());
        let sse = SseManager::new(connector, bus.clone(), ReconnectPolicy::from(&config));
        let likes = LikeController::new(api, config.like_cache_ttl);
        info!("portal session created for {}", config.base_url);
        Self {
            config,
            bus,
            sse,
            likes,
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn sse(&self) -> &SseManager {
        &self.sse
    }

    pub fn likes(&self) -> &LikeController {
        &self.likes
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.bus.subscribe()
    }

    /// Subscribe, then open the general stream, so no early event is missed.
    pub fn connect_general(&self) -> broadcast::Receiver<BusEvent> {
        let rx = self.bus.subscribe();
        self.sse.connect_general();
        rx
    }

    pub fn watch_task(&self, task_id: &str) -> broadcast::Receiver<BusEvent> {
        let rx = self.bus.subscribe();
        self.sse.connect_task(task_id);
        rx
    }

    pub fn watch_scores(&self, company_name: &str) -> broadcast::Receiver<BusEvent> {
        let rx = self.bus.subscribe();
        self.sse.connect_score(company_name);
        rx
    }

    /// Log viewer on the user tab, paged by the configured page size.
    pub fn log_viewer(&self, channel: Arc<dyn LogChannel>) -> LogViewer {
        LogViewer::new(channel, LogType::User, self.config.logs_per_page)
    }

    pub fn dispose(&self) {
        self.sse.close_all();
    }
}

impl Drop for PortalSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
