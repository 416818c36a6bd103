//! Storage seam. `PgStore` is the production backend; `MemoryStore` keeps the
//! same contract in process (including change-feed publication) for tests.
//!
//! `AppState` carries an `Arc<dyn Store>`.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{
    Application, ApplicationDetail, ApplicationWithJob, NewApplication,
};
use crate::models::job::{Job, JobInput};
use crate::models::notification::{AdminNotificationRow, NewNotification, Notification};
use crate::models::user::{NewProfile, ProfileUpdate, Role, UserProfile};

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const ALREADY_APPLIED: &str = "You have already applied to this position";

/// Row counts for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
pub struct TableCounts {
    pub users: i64,
    pub jobs: i64,
    pub applications: i64,
    pub notifications: i64,
}

#[async_trait]
pub trait Store: Send + Sync {
    // ── users ──────────────────────────────────────────────────────────────
    async fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>, AppError>;
    /// Inserts the profile, or returns the existing one when the id is taken.
    async fn create_profile(&self, profile: NewProfile) -> Result<UserProfile, AppError>;
    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<UserProfile>, AppError>;
    async fn list_profiles(&self, role: Option<Role>) -> Result<Vec<UserProfile>, AppError>;
    async fn delete_profile(&self, id: Uuid) -> Result<bool, AppError>;

    // ── jobs ───────────────────────────────────────────────────────────────
    /// All jobs, newest first.
    async fn list_jobs(&self) -> Result<Vec<Job>, AppError>;
    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, AppError>;
    async fn jobs_posted_by(&self, user_id: Uuid) -> Result<Vec<Job>, AppError>;
    async fn create_job(&self, posted_by: Uuid, input: JobInput) -> Result<Job, AppError>;
    async fn update_job(&self, id: Uuid, input: JobInput) -> Result<Option<Job>, AppError>;
    async fn delete_job(&self, id: Uuid) -> Result<bool, AppError>;

    // ── applications ───────────────────────────────────────────────────────
    async fn find_application(
        &self,
        job_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Application>, AppError>;
    /// Fails with `AppError::Conflict` when the (job, applicant) pair already exists.
    async fn insert_application(&self, new: NewApplication) -> Result<Application, AppError>;
    async fn application_detail(&self, id: Uuid) -> Result<Option<ApplicationDetail>, AppError>;
    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, AppError>;
    async fn applications_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ApplicationWithJob>, AppError>;
    async fn applications_for_job(&self, job_id: Uuid)
        -> Result<Vec<ApplicationDetail>, AppError>;
    async fn list_applications(&self) -> Result<Vec<ApplicationDetail>, AppError>;
    async fn delete_application(&self, id: Uuid) -> Result<bool, AppError>;

    // ── notifications ──────────────────────────────────────────────────────
    /// Rows addressed to `user_id` or broadcast, newest first.
    async fn list_notifications_for(&self, user_id: Uuid) -> Result<Vec<Notification>, AppError>;
    async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>, AppError>;
    async fn list_all_notifications(&self) -> Result<Vec<AdminNotificationRow>, AppError>;
    async fn count_unread(&self, user_id: Uuid) -> Result<i64, AppError>;
    /// Returns `None` when an identical new-application notice already exists.
    async fn insert_notification(
        &self,
        new: NewNotification,
    ) -> Result<Option<Notification>, AppError>;
    /// Marks one row addressed to `user_id` as read. Broadcast rows share one
    /// flag across all admins, so they match only with `include_broadcast`.
    /// `false` when no such row.
    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
        include_broadcast: bool,
    ) -> Result<bool, AppError>;
    /// Marks every unread row addressed to `user_id`. Returns the number changed.
    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, AppError>;

    async fn counts(&self) -> Result<TableCounts, AppError>;
}
