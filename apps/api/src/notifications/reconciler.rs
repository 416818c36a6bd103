//! Notification reconciler: merges bulk fetches and pushed rows into one
//! ordered, de-duplicated sequence.
//!
//! Invariants after every operation:
//! - ordered by (`created_at`, `id`) strictly descending, newest first
//! - each id appears at most once
//! - an entry's `read` flag never goes from true back to false through a merge

use uuid::Uuid;

use crate::models::notification::Notification;

/// Outcome of merging one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// The id was new and the row was placed by recency.
    Inserted,
    /// The id was known; its read flag advanced to true.
    Updated,
    /// The id was known and nothing changed.
    Unchanged,
}

#[derive(Debug, Default)]
pub struct NotificationFeed {
    entries: Vec<Notification>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a bulk fetch. Rows pushed before the fetch landed are kept.
    /// Returns how many ids were new.
    pub fn seed(&mut self, rows: impl IntoIterator<Item = Notification>) -> usize {
        let mut inserted = 0;
        for row in rows {
            if self.upsert(row) == Merge::Inserted {
                inserted += 1;
            }
        }
        inserted
    }

    /// Upserts by id. A known id keeps its stored message and timestamp.
    pub fn upsert(&mut self, incoming: Notification) -> Merge {
        if let Some(existing) = self.entries.iter_mut().find(|n| n.id == incoming.id) {
            if incoming.read && !existing.read {
                existing.read = true;
                return Merge::Updated;
            }
            return Merge::Unchanged;
        }

        let key = (incoming.created_at, incoming.id);
        let position = self
            .entries
            .partition_point(|n| (n.created_at, n.id) > key);
        self.entries.insert(position, incoming);
        Merge::Inserted
    }

    pub fn get(&self, id: Uuid) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    pub fn as_slice(&self) -> &[Notification] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unread_tally(&self) -> usize {
        self.entries.iter().filter(|n| !n.read).count()
    }

    /// Sets one entry's flag, returning the previous value.
    ///
    /// Setting `false` is only for undoing an optimistic flip whose durable
    /// write failed.
    pub(super) fn set_read(&mut self, id: Uuid, read: bool) -> Option<bool> {
        let entry = self.entries.iter_mut().find(|n| n.id == id)?;
        Some(std::mem::replace(&mut entry.read, read))
    }

    /// Marks every entry read. Returns the ids that changed.
    pub(super) fn mark_all_read(&mut self) -> Vec<Uuid> {
        self.entries
            .iter_mut()
            .filter(|n| !n.read)
            .map(|n| {
                n.read = true;
                n.id
            })
            .collect()
    }
}
