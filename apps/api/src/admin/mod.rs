//! Admin dashboard: platform counts, user moderation, and announcements.

pub mod handlers;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::models::notification::{NewNotification, Notification, NotificationKind};
use crate::models::user::Role;
use crate::store::{Store, TableCounts};

#[derive(Debug, Serialize)]
pub struct RoleCount {
    pub role: Role,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct PlatformStats {
    #[serde(flatten)]
    pub totals: TableCounts,
    pub users_by_role: Vec<RoleCount>,
}

pub async fn platform_stats(store: &dyn Store) -> Result<PlatformStats, AppError> {
    let totals = store.counts().await?;
    let users = store.list_profiles(None).await?;
    let users_by_role = Role::ALL
        .into_iter()
        .map(|role| RoleCount {
            role,
            count: users.iter().filter(|u| u.role == role).count(),
        })
        .collect();
    Ok(PlatformStats {
        totals,
        users_by_role,
    })
}

pub async fn remove_user(store: &dyn Store, auth: &AuthContext, id: Uuid) -> Result<(), AppError> {
    if id == auth.user_id {
        return Err(AppError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }
    if !store.delete_profile(id).await? {
        return Err(AppError::NotFound(format!("User {id} not found")));
    }
    info!(user_id = %id, deleted_by = %auth.user_id, "user deleted");
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementRequest {
    pub message: String,
}

/// Creates a broadcast notification (no recipient).
pub async fn announce(store: &dyn Store, req: AnnouncementRequest) -> Result<Notification, AppError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_string()));
    }
    let created = store
        .insert_notification(NewNotification {
            user_id: None,
            job_id: None,
            application_id: None,
            message: message.to_string(),
            kind: NotificationKind::Announcement,
        })
        .await?
        .ok_or_else(|| anyhow::anyhow!("announcement insert returned no row"))?;
    info!(notification_id = %created.id, "announcement created");
    Ok(created)
}
