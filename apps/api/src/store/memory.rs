use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Store, TableCounts, ALREADY_APPLIED};
use crate::errors::AppError;
use crate::models::application::{
    Application, ApplicationDetail, ApplicationWithJob, NewApplication,
};
use crate::models::job::{Job, JobInput};
use crate::models::notification::{
    AdminNotificationRow, NewNotification, Notification, NotificationKind,
};
use crate::models::user::{NewProfile, ProfileUpdate, Role, UserProfile};
use crate::realtime::{ChangeEvent, ChangeFeed, Table};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserProfile>,
    jobs: HashMap<Uuid, Job>,
    applications: HashMap<Uuid, Application>,
    notifications: HashMap<Uuid, Notification>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Tables {
    /// Server clock, strictly increasing per store like `clock_timestamp()` rows.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn detail(&self, application: &Application) -> Option<ApplicationDetail> {
        Some(ApplicationDetail {
            application: application.clone(),
            job: self.jobs.get(&application.job_id)?.clone(),
            applicant: self.users.get(&application.user_id)?.clone(),
        })
    }

    fn cascade_application(&mut self, id: Uuid) {
        self.applications.remove(&id);
        self.notifications
            .retain(|_, n| n.application_id != Some(id));
    }

    fn cascade_job(&mut self, id: Uuid) {
        self.jobs.remove(&id);
        let applications: Vec<Uuid> = self
            .applications
            .values()
            .filter(|a| a.job_id == id)
            .map(|a| a.id)
            .collect();
        for application in applications {
            self.cascade_application(application);
        }
        self.notifications.retain(|_, n| n.job_id != Some(id));
    }
}

/// In-process store with the same contract as `PgStore`, including the
/// unique (job, applicant) constraint, cascading deletes, and change-feed
/// publication for application and notification inserts.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    feed: ChangeFeed,
    fail_notification_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new(feed: ChangeFeed) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            feed,
            fail_notification_writes: AtomicBool::new(false),
        }
    }

    /// Simulates an unavailable store for notification inserts and updates.
    pub fn fail_notification_writes(&self, fail: bool) {
        self.fail_notification_writes.store(fail, Ordering::SeqCst);
    }

    fn check_notification_write(&self) -> Result<(), AppError> {
        if self.fail_notification_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "notification store unavailable"
            )));
        }
        Ok(())
    }

    /// Publishes the same key-only payload the row trigger sends.
    fn publish_keys(&self, table: Table, keys: serde_json::Value) {
        self.feed.publish(ChangeEvent::insert(table, keys));
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>, AppError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<UserProfile, AppError> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.users.get(&profile.id) {
            return Ok(existing.clone());
        }
        let created_at = tables.next_timestamp();
        let row = UserProfile {
            id: profile.id,
            username: profile.username,
            email: profile.email,
            role: Role::default(),
            country: None,
            country_code: None,
            avatar_url: None,
            created_at,
        };
        tables.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<UserProfile>, AppError> {
        let mut tables = self.tables.lock().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(country) = update.country {
            user.country = Some(country);
        }
        if let Some(code) = update.country_code {
            user.country_code = Some(code);
        }
        if let Some(url) = update.avatar_url {
            user.avatar_url = Some(url);
        }
        Ok(Some(user.clone()))
    }

    async fn list_profiles(&self, role: Option<Role>) -> Result<Vec<UserProfile>, AppError> {
        let tables = self.tables.lock().await;
        let mut users: Vec<_> = tables
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn delete_profile(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        let jobs: Vec<Uuid> = tables
            .jobs
            .values()
            .filter(|j| j.posted_by == id)
            .map(|j| j.id)
            .collect();
        for job in jobs {
            tables.cascade_job(job);
        }
        let applications: Vec<Uuid> = tables
            .applications
            .values()
            .filter(|a| a.user_id == id)
            .map(|a| a.id)
            .collect();
        for application in applications {
            tables.cascade_application(application);
        }
        tables.notifications.retain(|_, n| n.user_id != Some(id));
        Ok(true)
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, AppError> {
        let tables = self.tables.lock().await;
        let mut jobs: Vec<_> = tables.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, AppError> {
        Ok(self.tables.lock().await.jobs.get(&id).cloned())
    }

    async fn jobs_posted_by(&self, user_id: Uuid) -> Result<Vec<Job>, AppError> {
        let mut jobs = self.list_jobs().await?;
        jobs.retain(|j| j.posted_by == user_id);
        Ok(jobs)
    }

    async fn create_job(&self, posted_by: Uuid, input: JobInput) -> Result<Job, AppError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&posted_by) {
            return Err(AppError::NotFound(format!("User {posted_by} not found")));
        }
        let now = tables.next_timestamp();
        let job = input.into_job(posted_by, now);
        tables.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn update_job(&self, id: Uuid, input: JobInput) -> Result<Option<Job>, AppError> {
        let mut tables = self.tables.lock().await;
        let now = tables.next_timestamp();
        let Some(job) = tables.jobs.get_mut(&id) else {
            return Ok(None);
        };
        job.title = input.title;
        job.company_name = input.company_name;
        job.location = input.location;
        job.country = input.country;
        job.job_type = input.job_type;
        job.salary_range = input.salary_range;
        job.description = input.description;
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        if !tables.jobs.contains_key(&id) {
            return Ok(false);
        }
        tables.cascade_job(id);
        Ok(true)
    }

    async fn find_application(
        &self,
        job_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Application>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .applications
            .values()
            .find(|a| a.job_id == job_id && a.user_id == user_id)
            .cloned())
    }

    async fn insert_application(&self, new: NewApplication) -> Result<Application, AppError> {
        let application = {
            let mut tables = self.tables.lock().await;
            if !tables.jobs.contains_key(&new.job_id) {
                return Err(AppError::NotFound(format!("Job {} not found", new.job_id)));
            }
            if tables
                .applications
                .values()
                .any(|a| a.job_id == new.job_id && a.user_id == new.user_id)
            {
                return Err(AppError::Conflict(ALREADY_APPLIED.to_string()));
            }
            let applied_at = tables.next_timestamp();
            let application = Application {
                id: Uuid::new_v4(),
                job_id: new.job_id,
                user_id: new.user_id,
                cover_letter: new.cover_letter,
                resume_url: new.resume_url,
                applied_at,
            };
            tables
                .applications
                .insert(application.id, application.clone());
            application
        };
        self.publish_keys(
            Table::Applications,
            json!({
                "id": application.id,
                "job_id": application.job_id,
                "user_id": application.user_id,
            }),
        );
        Ok(application)
    }

    async fn application_detail(&self, id: Uuid) -> Result<Option<ApplicationDetail>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .applications
            .get(&id)
            .and_then(|a| tables.detail(a)))
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, AppError> {
        Ok(self.tables.lock().await.applications.get(&id).cloned())
    }

    async fn applications_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ApplicationWithJob>, AppError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<_> = tables
            .applications
            .values()
            .filter(|a| a.user_id == user_id)
            .filter_map(|a| {
                Some(ApplicationWithJob {
                    application: a.clone(),
                    job: tables.jobs.get(&a.job_id)?.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| b.application.applied_at.cmp(&a.application.applied_at));
        Ok(rows)
    }

    async fn applications_for_job(
        &self,
        job_id: Uuid,
    ) -> Result<Vec<ApplicationDetail>, AppError> {
        let mut rows = self.list_applications().await?;
        rows.retain(|d| d.application.job_id == job_id);
        Ok(rows)
    }

    async fn list_applications(&self) -> Result<Vec<ApplicationDetail>, AppError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<_> = tables
            .applications
            .values()
            .filter_map(|a| tables.detail(a))
            .collect();
        rows.sort_by(|a, b| b.application.applied_at.cmp(&a.application.applied_at));
        Ok(rows)
    }

    async fn delete_application(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        if !tables.applications.contains_key(&id) {
            return Ok(false);
        }
        tables.cascade_application(id);
        Ok(true)
    }

    async fn list_notifications_for(&self, user_id: Uuid) -> Result<Vec<Notification>, AppError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<_> = tables
            .notifications
            .values()
            .filter(|n| n.user_id.map_or(true, |u| u == user_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>, AppError> {
        Ok(self.tables.lock().await.notifications.get(&id).cloned())
    }

    async fn list_all_notifications(&self) -> Result<Vec<AdminNotificationRow>, AppError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<_> = tables
            .notifications
            .values()
            .map(|n| {
                let recipient = n.user_id.and_then(|u| tables.users.get(&u));
                AdminNotificationRow {
                    notification: n.clone(),
                    recipient_username: recipient.map(|u| u.username.clone()),
                    recipient_email: recipient.and_then(|u| u.email.clone()),
                    job_title: n
                        .job_id
                        .and_then(|j| tables.jobs.get(&j))
                        .map(|j| j.title.clone()),
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            (b.notification.created_at, b.notification.id)
                .cmp(&(a.notification.created_at, a.notification.id))
        });
        Ok(rows)
    }

    async fn count_unread(&self, user_id: Uuid) -> Result<i64, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .notifications
            .values()
            .filter(|n| n.user_id == Some(user_id) && !n.read)
            .count() as i64)
    }

    async fn insert_notification(
        &self,
        new: NewNotification,
    ) -> Result<Option<Notification>, AppError> {
        self.check_notification_write()?;
        let notification = {
            let mut tables = self.tables.lock().await;
            let duplicate = new.kind == NotificationKind::NewApplication
                && new.application_id.is_some()
                && tables.notifications.values().any(|n| {
                    n.kind == NotificationKind::NewApplication
                        && n.application_id == new.application_id
                        && n.user_id == new.user_id
                });
            if duplicate {
                return Ok(None);
            }
            let created_at = tables.next_timestamp();
            let notification = Notification {
                id: Uuid::new_v4(),
                user_id: new.user_id,
                job_id: new.job_id,
                application_id: new.application_id,
                message: new.message,
                kind: new.kind,
                read: false,
                created_at,
            };
            tables
                .notifications
                .insert(notification.id, notification.clone());
            notification
        };
        self.publish_keys(
            Table::Notifications,
            json!({
                "id": notification.id,
                "user_id": notification.user_id,
                "job_id": notification.job_id,
                "application_id": notification.application_id,
            }),
        );
        Ok(Some(notification))
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
        include_broadcast: bool,
    ) -> Result<bool, AppError> {
        self.check_notification_write()?;
        let mut tables = self.tables.lock().await;
        match tables.notifications.get_mut(&id) {
            Some(n) if n.user_id.map_or(include_broadcast, |u| u == user_id) => {
                n.read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.check_notification_write()?;
        let mut tables = self.tables.lock().await;
        let mut changed = 0;
        for n in tables.notifications.values_mut() {
            if n.user_id == Some(user_id) && !n.read {
                n.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn counts(&self) -> Result<TableCounts, AppError> {
        let tables = self.tables.lock().await;
        Ok(TableCounts {
            users: tables.users.len() as i64,
            jobs: tables.jobs.len() as i64,
            applications: tables.applications.len() as i64,
            notifications: tables.notifications.len() as i64,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::models::job::JobType;

    pub async fn user(store: &MemoryStore, name: &str, role: Role) -> UserProfile {
        let email = format!("{name}@example.com");
        let profile = store
            .create_profile(NewProfile::from_identity(Uuid::new_v4(), Some(&email)))
            .await
            .unwrap();
        store
            .update_profile(
                profile.id,
                ProfileUpdate {
                    role: Some(role),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap()
    }

    pub fn job_input(title: &str) -> JobInput {
        JobInput {
            title: title.to_string(),
            company_name: "Acme".to_string(),
            location: "Remote".to_string(),
            country: None,
            job_type: JobType::Remote,
            salary_range: None,
            description: "<p>Do the work</p>".to_string(),
        }
    }

    pub async fn job(store: &MemoryStore, poster: &UserProfile, title: &str) -> Job {
        store.create_job(poster.id, job_input(title)).await.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::realtime::ChangeFilter;

    fn store() -> (MemoryStore, ChangeFeed) {
        let feed = ChangeFeed::new(64);
        (MemoryStore::new(feed.clone()), feed)
    }

    #[tokio::test]
    async fn test_create_profile_is_get_or_create() {
        let (store, _) = store();
        let id = Uuid::new_v4();
        let first = store
            .create_profile(NewProfile::from_identity(id, Some("a@b.c")))
            .await
            .unwrap();
        let second = store
            .create_profile(NewProfile::from_identity(id, Some("other@b.c")))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.counts().await.unwrap().users, 1);
    }

    #[tokio::test]
    async fn test_duplicate_application_is_conflict() {
        let (store, _) = store();
        let recruiter = user(&store, "rita", Role::Recruiter).await;
        let seeker = user(&store, "sam", Role::JobSeeker).await;
        let job = job(&store, &recruiter, "Backend").await;
        let new = NewApplication {
            job_id: job.id,
            user_id: seeker.id,
            cover_letter: "hi".into(),
            resume_url: None,
        };
        store.insert_application(new.clone()).await.unwrap();
        let err = store.insert_application(new).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.counts().await.unwrap().applications, 1);
    }

    #[tokio::test]
    async fn test_inserts_publish_keys_only() {
        let (store, feed) = store();
        let mut sub = feed.subscribe("apps", ChangeFilter::inserts(Table::Applications));
        let recruiter = user(&store, "rita", Role::Recruiter).await;
        let seeker = user(&store, "sam", Role::JobSeeker).await;
        let job = job(&store, &recruiter, "Backend").await;
        let app = store
            .insert_application(NewApplication {
                job_id: job.id,
                user_id: seeker.id,
                cover_letter: "a very long letter".into(),
                resume_url: None,
            })
            .await
            .unwrap();

        let event = sub.recv().await.unwrap();
        assert_eq!(event.row["id"], app.id.to_string());
        assert_eq!(event.row["job_id"], job.id.to_string());
        assert!(event.row.get("cover_letter").is_none());
        assert!(event.row.get("resume_url").is_none());

        let mut notes = feed.subscribe("notes", ChangeFilter::inserts(Table::Notifications));
        let notice = store
            .insert_notification(NewNotification {
                user_id: None,
                job_id: None,
                application_id: None,
                message: "x".repeat(10_000),
                kind: NotificationKind::Announcement,
            })
            .await
            .unwrap()
            .unwrap();
        let event = notes.recv().await.unwrap();
        assert_eq!(event.row["id"], notice.id.to_string());
        assert!(event.row["user_id"].is_null());
        assert!(event.row.get("message").is_none());
    }

    #[tokio::test]
    async fn test_new_application_notice_inserted_once() {
        let (store, _) = store();
        let recruiter = user(&store, "rita", Role::Recruiter).await;
        let application_id = Some(Uuid::new_v4());
        let new = NewNotification {
            user_id: Some(recruiter.id),
            job_id: None,
            application_id,
            message: "New application".into(),
            kind: NotificationKind::NewApplication,
        };
        assert!(store.insert_notification(new.clone()).await.unwrap().is_some());
        assert!(store.insert_notification(new).await.unwrap().is_none());
        assert_eq!(store.count_unread(recruiter.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_deleting_job_cascades() {
        let (store, _) = store();
        let recruiter = user(&store, "rita", Role::Recruiter).await;
        let seeker = user(&store, "sam", Role::JobSeeker).await;
        let job = job(&store, &recruiter, "Backend").await;
        let app = store
            .insert_application(NewApplication {
                job_id: job.id,
                user_id: seeker.id,
                cover_letter: "hi".into(),
                resume_url: None,
            })
            .await
            .unwrap();
        store
            .insert_notification(NewNotification {
                user_id: Some(recruiter.id),
                job_id: Some(job.id),
                application_id: Some(app.id),
                message: "New application".into(),
                kind: NotificationKind::NewApplication,
            })
            .await
            .unwrap();

        assert!(store.delete_job(job.id).await.unwrap());
        let counts = store.counts().await.unwrap();
        assert_eq!(counts.applications, 0);
        assert_eq!(counts.notifications, 0);
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let (store, _) = store();
        let recruiter = user(&store, "rita", Role::Recruiter).await;
        let a = job(&store, &recruiter, "A").await;
        let b = job(&store, &recruiter, "B").await;
        assert!(b.created_at > a.created_at);
        let listed = store.list_jobs().await.unwrap();
        assert_eq!(listed[0].id, b.id);
    }
}
