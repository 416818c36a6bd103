//! Read-state tracker: unread counter plus optimistic mark-as-read.
//!
//! Each mutation flips local state first, then issues one durable write.
//! The mutation is recorded as Pending, then Committed or Failed; a failed
//! write undoes exactly the flips it made and the error goes back to the caller.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::reconciler::{Merge, NotificationFeed};
use crate::errors::AppError;
use crate::models::notification::Notification;
use crate::store::Store;

const MUTATION_LOG_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    Pending,
    Committed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    MarkRead(Uuid),
    MarkAllRead,
}

#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub seq: u64,
    pub kind: MutationKind,
    pub status: MutationStatus,
}

#[derive(Debug)]
pub struct ReadStateTracker {
    recipient: Uuid,
    /// Admins may mark broadcast (null-recipient) rows.
    include_broadcast: bool,
    unread: u64,
    next_seq: u64,
    log: VecDeque<MutationRecord>,
}

impl ReadStateTracker {
    pub fn new(recipient: Uuid, include_broadcast: bool) -> Self {
        Self {
            recipient,
            include_broadcast,
            unread: 0,
            next_seq: 0,
            log: VecDeque::with_capacity(MUTATION_LOG_LEN),
        }
    }

    pub fn unread_count(&self) -> u64 {
        self.unread
    }

    /// Re-reads the counter from the store. It may briefly disagree with the
    /// reconciled sequence; nothing ties the two together.
    pub async fn refresh(&mut self, store: &dyn Store) -> Result<u64, AppError> {
        let count = store.count_unread(self.recipient).await?;
        self.unread = u64::try_from(count).unwrap_or(0);
        Ok(self.unread)
    }

    /// Accounts for a row that was just merged into the sequence.
    pub fn on_merged(&mut self, notification: &Notification, merge: Merge) {
        if merge == Merge::Inserted
            && !notification.read
            && notification.user_id == Some(self.recipient)
        {
            self.unread += 1;
        }
    }

    pub async fn mark_read(
        &mut self,
        feed: &mut NotificationFeed,
        store: &dyn Store,
        id: Uuid,
    ) -> Result<(), AppError> {
        let seq = self.begin(MutationKind::MarkRead(id));
        let prior_unread = self.unread;

        let flipped = feed.set_read(id, true) == Some(false);
        let addressed_to_me = feed
            .get(id)
            .is_some_and(|n| n.user_id == Some(self.recipient));
        if flipped && addressed_to_me {
            self.unread = self.unread.saturating_sub(1);
        }

        let outcome = match store
            .mark_notification_read(id, self.recipient, self.include_broadcast)
            .await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::NotFound(format!("Notification {id} not found"))),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                self.finish(seq, MutationStatus::Committed);
                Ok(())
            }
            Err(e) => {
                warn!(notification_id = %id, "mark_read failed, reverting: {e}");
                if flipped {
                    feed.set_read(id, false);
                }
                self.unread = prior_unread;
                self.finish(seq, MutationStatus::Failed);
                Err(e)
            }
        }
    }

    /// Returns the number of rows the durable write changed.
    pub async fn mark_all_read(
        &mut self,
        feed: &mut NotificationFeed,
        store: &dyn Store,
    ) -> Result<u64, AppError> {
        let seq = self.begin(MutationKind::MarkAllRead);
        let prior_unread = self.unread;
        let flipped = feed.mark_all_read();
        self.unread = 0;

        match store.mark_all_notifications_read(self.recipient).await {
            Ok(changed) => {
                debug!(changed, "marked all notifications read");
                self.finish(seq, MutationStatus::Committed);
                Ok(changed)
            }
            Err(e) => {
                warn!("mark_all_read failed, reverting {} entries: {e}", flipped.len());
                for id in flipped {
                    feed.set_read(id, false);
                }
                self.unread = prior_unread;
                self.finish(seq, MutationStatus::Failed);
                Err(e)
            }
        }
    }

    /// Most recent mutations, oldest first.
    pub fn mutations(&self) -> impl Iterator<Item = &MutationRecord> {
        self.log.iter()
    }

    fn begin(&mut self, kind: MutationKind) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.log.len() == MUTATION_LOG_LEN {
            self.log.pop_front();
        }
        self.log.push_back(MutationRecord {
            seq,
            kind,
            status: MutationStatus::Pending,
        });
        seq
    }

    fn finish(&mut self, seq: u64, status: MutationStatus) {
        if let Some(record) = self.log.iter_mut().find(|r| r.seq == seq) {
            record.status = status;
        }
    }
}
