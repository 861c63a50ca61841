use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::BusEvent;

/// Spawn a background task that feeds every bus event to `handler` until the
/// bus shuts down. Lagging receivers log and keep going.
pub fn spawn_consumer<F>(mut rx: broadcast::Receiver<BusEvent>, mut handler: F) -> JoinHandle<()>
where
    F: FnMut(&BusEvent) + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => handler(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("bus consumer lagged, dropped {n} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
