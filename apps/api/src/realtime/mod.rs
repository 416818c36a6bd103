//! Event channel adapter: row-level change events, filtered subscriptions, and
//! the PostgreSQL `LISTEN` pump that feeds them.
//!
//! Delivery order within one subscription equals commit order at the store.
//! Nothing is guaranteed across subscriptions.

pub mod feed;
pub mod listener;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub use feed::{ChangeFeed, Subscription};

/// Postgres `NOTIFY` channel the row triggers publish on.
pub const CHANGE_CHANNEL: &str = "row_changes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Users,
    Jobs,
    Applications,
    Notifications,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One committed row-level change. `row` carries the row's keys, not its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub op: ChangeOp,
    pub row: Value,
}

impl ChangeEvent {
    #[cfg(test)]
    pub fn insert(table: Table, row: Value) -> Self {
        Self {
            table,
            op: ChangeOp::Insert,
            row,
        }
    }

    /// The changed row's `id`, when present and well formed.
    pub fn row_id(&self) -> Option<Uuid> {
        self.row
            .get("id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

/// Constrains a subscription by table, operation and optionally one column equality.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeFilter {
    pub table: Table,
    pub op: ChangeOp,
    pub column_eq: Option<(String, String)>,
}

impl ChangeFilter {
    pub fn inserts(table: Table) -> Self {
        Self {
            table,
            op: ChangeOp::Insert,
            column_eq: None,
        }
    }

    pub fn column_eq(mut self, column: &str, value: impl ToString) -> Self {
        self.column_eq = Some((column.to_string(), value.to_string()));
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table || event.op != self.op {
            return false;
        }
        match &self.column_eq {
            None => true,
            Some((column, expected)) => match event.row.get(column) {
                Some(Value::String(s)) => s == expected,
                Some(Value::Null) | None => false,
                Some(other) => other.to_string() == *expected,
            },
        }
    }
}
