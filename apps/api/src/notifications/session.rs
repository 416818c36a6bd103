//! One connected dashboard: its notification sequence, unread counter,
//! working set of jobs, and the two subscriptions that keep them live.
//!
//! A session is driven by a single task. Subscription deliveries and client
//! commands are handled one at a time, so its state needs no locking.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::read_state::ReadStateTracker;
use super::reconciler::{Merge, NotificationFeed};
use super::watcher::{notify_job_poster, ApplicationWatcher};
use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::models::application::ApplicationDetail;
use crate::models::notification::Notification;
use crate::realtime::{ChangeFeed, ChangeFilter, Subscription, Table};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    MarkRead { id: Uuid },
    MarkAllRead,
    Refresh,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Snapshot {
        notifications: Vec<Notification>,
        unread_count: u64,
    },
    Notification {
        notification: Notification,
        unread_count: u64,
    },
    Read {
        id: Uuid,
        unread_count: u64,
    },
    Application {
        application: ApplicationDetail,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

impl From<&AppError> for ServerMessage {
    fn from(e: &AppError) -> Self {
        ServerMessage::Error {
            code: e.code(),
            message: e.public_message(),
        }
    }
}

#[derive(Debug)]
pub enum SessionEvent {
    /// A notification addressed to me was inserted; only its id travels on the feed.
    NotificationInserted(Uuid),
    Application(ApplicationDetail),
    Closed,
}

pub struct DashboardSession {
    ctx: AuthContext,
    store: Arc<dyn Store>,
    feed: NotificationFeed,
    read_state: ReadStateTracker,
    working_set: HashSet<Uuid>,
    inbox: Subscription,
    watcher: Option<ApplicationWatcher>,
}

impl DashboardSession {
    /// Subscribes first, then loads, so rows committed in between arrive as pushes.
    pub async fn open(
        ctx: AuthContext,
        store: Arc<dyn Store>,
        changes: &ChangeFeed,
    ) -> Result<Self, AppError> {
        let inbox = changes.subscribe(
            "notifications",
            ChangeFilter::inserts(Table::Notifications).column_eq("user_id", ctx.user_id),
        );
        let watcher = ctx
            .role()
            .posts_jobs()
            .then(|| ApplicationWatcher::watch(changes, store.clone()));

        let mut session = Self {
            read_state: ReadStateTracker::new(ctx.user_id, ctx.is_admin()),
            ctx,
            store,
            feed: NotificationFeed::new(),
            working_set: HashSet::new(),
            inbox,
            watcher,
        };
        session.load().await?;
        debug!(user_id = %session.ctx.user_id, "dashboard session opened");
        Ok(session)
    }

    async fn load(&mut self) -> Result<(), AppError> {
        let me = self.ctx.user_id;
        if self.ctx.role().posts_jobs() {
            self.working_set = self
                .store
                .jobs_posted_by(me)
                .await?
                .into_iter()
                .map(|job| job.id)
                .collect();
        }
        let rows = self.store.list_notifications_for(me).await?;
        self.feed.seed(rows);
        self.read_state.refresh(self.store.as_ref()).await?;
        Ok(())
    }

    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::Snapshot {
            notifications: self.feed.as_slice().to_vec(),
            unread_count: self.read_state.unread_count(),
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        self.feed.as_slice()
    }

    pub fn unread_count(&self) -> u64 {
        self.read_state.unread_count()
    }

    pub fn is_watching_job(&self, job_id: Uuid) -> bool {
        self.working_set.contains(&job_id)
    }

    /// Waits for the next subscription delivery. Cancel-safe.
    pub async fn next_event(&mut self) -> SessionEvent {
        loop {
            tokio::select! {
                event = self.inbox.recv() => {
                    let Some(event) = event else {
                        return SessionEvent::Closed;
                    };
                    match event.row_id() {
                        Some(id) => return SessionEvent::NotificationInserted(id),
                        None => warn!("notification change event without a usable id"),
                    }
                }
                Some(detail) = next_application(&mut self.watcher) => {
                    return SessionEvent::Application(detail);
                }
            }
        }
    }

    pub async fn handle_event(&mut self, event: SessionEvent) -> Vec<ServerMessage> {
        match event {
            SessionEvent::NotificationInserted(id) => {
                let notification = match self.store.get_notification(id).await {
                    Ok(Some(notification)) => notification,
                    Ok(None) => {
                        debug!(notification_id = %id, "notification gone before fetch");
                        return Vec::new();
                    }
                    Err(e) => {
                        warn!(notification_id = %id, "notification fetch failed: {e}");
                        return Vec::new();
                    }
                };
                let merge = self.feed.upsert(notification.clone());
                self.read_state.on_merged(&notification, merge);
                if merge != Merge::Inserted {
                    return Vec::new();
                }
                vec![ServerMessage::Notification {
                    notification,
                    unread_count: self.read_state.unread_count(),
                }]
            }
            SessionEvent::Application(detail) => {
                if !self.working_set.contains(&detail.application.job_id) {
                    return Vec::new();
                }
                // The notice itself comes back through the inbox subscription.
                notify_job_poster(self.store.as_ref(), &detail).await;
                if detail.job.posted_by == self.ctx.user_id {
                    vec![ServerMessage::Application {
                        application: detail,
                    }]
                } else {
                    Vec::new()
                }
            }
            SessionEvent::Closed => Vec::new(),
        }
    }

    pub async fn handle_command(&mut self, command: ClientCommand) -> Vec<ServerMessage> {
        let store = self.store.clone();
        match command {
            ClientCommand::MarkRead { id } => {
                match self
                    .read_state
                    .mark_read(&mut self.feed, store.as_ref(), id)
                    .await
                {
                    Ok(()) => vec![ServerMessage::Read {
                        id,
                        unread_count: self.read_state.unread_count(),
                    }],
                    Err(e) => vec![(&e).into(), self.snapshot()],
                }
            }
            ClientCommand::MarkAllRead => {
                match self
                    .read_state
                    .mark_all_read(&mut self.feed, store.as_ref())
                    .await
                {
                    Ok(_) => vec![self.snapshot()],
                    Err(e) => vec![(&e).into(), self.snapshot()],
                }
            }
            ClientCommand::Refresh => match self.load().await {
                Ok(()) => vec![self.snapshot()],
                Err(e) => vec![(&e).into()],
            },
        }
    }
}

async fn next_application(watcher: &mut Option<ApplicationWatcher>) -> Option<ApplicationDetail> {
    match watcher {
        Some(watcher) => watcher.next().await,
        None => std::future::pending().await,
    }
}
