use std::time::Duration;

use esg_portal_client::{BusEvent, PortalConfig};
use httpmock::MockServer;
use tokio::sync::broadcast;
use tokio::time::{timeout_at, Instant};

/// Config pointing at a mock portal, with fast reconnects.
pub fn config_for(server: &MockServer) -> PortalConfig {
    PortalConfig {
        base_url: server.base_url(),
        session_cookie: Some("session=integration".to_string()),
        max_reconnect_attempts: 2,
        reconnect_delay: Duration::from_millis(5),
        ..PortalConfig::default()
    }
}

/// Receive events until `done` matches one (inclusive). Panics after 10 s.
pub async fn collect_until<F>(rx: &mut broadcast::Receiver<BusEvent>, mut done: F) -> Vec<BusEvent>
where
    F: FnMut(&BusEvent) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut seen = Vec::new();
    loop {
        let event = match timeout_at(deadline, rx.recv()).await {
            Ok(Ok(event)) => event,
            Ok(Err(e)) => panic!("bus receive failed: {e}"),
            Err(_) => panic!(
                "timed out, saw {:?}",
                seen.iter().map(BusEvent::name).collect::<Vec<_>>()
            ),
        };
        let finished = done(&event);
        seen.push(event);
        if finished {
            return seen;
        }
    }
}
