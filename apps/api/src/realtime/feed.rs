use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{ChangeEvent, ChangeFilter};

/// In-process fan-out of committed row changes.
///
/// Producers are the Postgres listener pump in production and `MemoryStore`
/// in tests. Every subscription holds its own broadcast receiver.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to every live subscription. Returns the receiver count.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        // No receivers is not an error: nobody is listening yet.
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self, name: &str, filter: ChangeFilter) -> Subscription {
        debug!(channel = name, table = ?filter.table, "subscribed");
        Subscription {
            name: name.to_string(),
            filter,
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live, filtered view of the change feed. Dropping it unsubscribes.
pub struct Subscription {
    name: String,
    filter: ChangeFilter,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next matching event, or `None` once the feed is gone.
    ///
    /// Cancel-safe: safe to use as a `tokio::select!` branch.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(channel = %self.name, skipped = n, "subscription lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(channel = %self.name, "unsubscribed");
    }
}
