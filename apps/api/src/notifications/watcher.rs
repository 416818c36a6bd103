//! Application-insert watcher.
//!
//! Observes every new application system-wide, resolves it to the full
//! application + job + applicant detail, and hands only resolved rows on.
//! Events that cannot be resolved are dropped (logged, never retried).

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::application::ApplicationDetail;
use crate::models::notification::{NewNotification, Notification, NotificationKind};
use crate::realtime::{ChangeEvent, ChangeFeed, ChangeFilter, Subscription, Table};
use crate::store::Store;

const WATCH_BUFFER: usize = 32;

/// Enriched application inserts, in commit order.
///
/// Enrichment runs on its own task, so a fetch already in flight finishes even
/// if the consumer stops polling. The task and its subscription end once the
/// watcher is dropped.
pub struct ApplicationWatcher {
    rx: mpsc::Receiver<ApplicationDetail>,
}

impl ApplicationWatcher {
    pub fn watch(changes: &ChangeFeed, store: Arc<dyn Store>) -> Self {
        let subscription =
            changes.subscribe("applications", ChangeFilter::inserts(Table::Applications));
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        tokio::spawn(pump(subscription, store, tx));
        Self { rx }
    }

    /// Cancel-safe.
    pub async fn next(&mut self) -> Option<ApplicationDetail> {
        self.rx.recv().await
    }
}

async fn pump(
    mut subscription: Subscription,
    store: Arc<dyn Store>,
    tx: mpsc::Sender<ApplicationDetail>,
) {
    loop {
        let event = tokio::select! {
            _ = tx.closed() => break,
            event = subscription.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        let Some(detail) = enrich(store.as_ref(), &event).await else {
            continue;
        };
        if tx.send(detail).await.is_err() {
            break;
        }
    }
    debug!(channel = subscription.name(), "application watcher stopped");
}

/// Resolves an application insert event, or `None` when it cannot be resolved.
pub async fn enrich(store: &dyn Store, event: &ChangeEvent) -> Option<ApplicationDetail> {
    let Some(id) = event.row_id() else {
        warn!("application change event without a usable id, dropped");
        return None;
    };
    match store.application_detail(id).await {
        Ok(Some(detail)) => Some(detail),
        Ok(None) => {
            debug!(application_id = %id, "application not visible, event dropped");
            None
        }
        Err(e) => {
            warn!(application_id = %id, "application enrichment failed, event dropped: {e}");
            None
        }
    }
}

pub fn new_application_message(detail: &ApplicationDetail) -> String {
    let applicant = if detail.applicant.username.trim().is_empty() {
        "a candidate"
    } else {
        detail.applicant.username.as_str()
    };
    format!(
        "New application for \"{}\" from {}",
        detail.job.title, applicant
    )
}

/// Creates the poster's notice for an application. Single attempt; a failed
/// write is logged and never touches the application itself.
pub async fn notify_job_poster(
    store: &dyn Store,
    detail: &ApplicationDetail,
) -> Option<Notification> {
    let new = NewNotification {
        user_id: Some(detail.job.posted_by),
        job_id: Some(detail.job.id),
        application_id: Some(detail.application.id),
        message: new_application_message(detail),
        kind: NotificationKind::NewApplication,
    };
    match store.insert_notification(new).await {
        Ok(Some(notification)) => {
            info!(
                notification_id = %notification.id,
                application_id = %detail.application.id,
                "notified job poster"
            );
            Some(notification)
        }
        Ok(None) => {
            debug!(application_id = %detail.application.id, "poster already notified");
            None
        }
        Err(e) => {
            warn!(
                application_id = %detail.application.id,
                "notification write failed: {e}"
            );
            None
        }
    }
}
