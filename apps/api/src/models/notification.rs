use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewApplication,
    Announcement,
}

/// `message` and `created_at` never change after insert; `read` only goes false → true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    /// `None` addresses every admin.
    pub user_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub application_id: Option<Uuid>,
    pub message: String,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub application_id: Option<Uuid>,
    pub message: String,
    pub kind: NotificationKind,
}

/// Admin listing row: a notification with its recipient and job resolved.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminNotificationRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub notification: Notification,
    pub recipient_username: Option<String>,
    pub recipient_email: Option<String>,
    pub job_title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_row_flattens_notification() {
        let row = AdminNotificationRow {
            notification: Notification {
                id: Uuid::nil(),
                user_id: None,
                job_id: None,
                application_id: None,
                message: "Maintenance tonight".into(),
                kind: NotificationKind::Announcement,
                read: false,
                created_at: Utc::now(),
            },
            recipient_username: None,
            recipient_email: None,
            job_title: None,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["kind"], "announcement");
        assert_eq!(json["message"], "Maintenance tonight");
        assert!(json["user_id"].is_null());
        assert!(json.get("notification").is_none());
        assert!(json["recipient_username"].is_null());
    }
}
