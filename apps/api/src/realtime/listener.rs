use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ChangeEvent, ChangeFeed, CHANGE_CHANNEL};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Starts the single per-process pump from Postgres `NOTIFY` into the change feed.
///
/// `PgListener` reconnects on its own inside `recv`; when that fails too the
/// pump backs off (1s, 2s, 4s … 30s) and tries again. Events committed while
/// disconnected are not replayed.
pub async fn spawn_change_pump(pool: &PgPool, feed: ChangeFeed) -> Result<JoinHandle<()>> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANGE_CHANNEL).await?;
    info!("Listening for row changes on '{CHANGE_CHANNEL}'");

    Ok(tokio::spawn(async move {
        let mut failures: u32 = 0;
        loop {
            match listener.recv().await {
                Ok(notification) => {
                    failures = 0;
                    match decode_payload(notification.payload()) {
                        Some(event) => {
                            let receivers = feed.publish(event);
                            debug!(receivers, "row change published");
                        }
                        None => warn!(
                            payload = notification.payload(),
                            "undecodable row change payload"
                        ),
                    }
                }
                Err(e) => {
                    let delay = backoff_delay(failures);
                    failures = failures.saturating_add(1);
                    warn!(
                        "Change listener error: {e}; retrying after {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }))
}

fn decode_payload(payload: &str) -> Option<ChangeEvent> {
    serde_json::from_str(payload).ok()
}

fn backoff_delay(failures: u32) -> Duration {
    let millis = 1000u64.saturating_mul(1 << failures.min(5));
    Duration::from_millis(millis).min(MAX_BACKOFF)
}
