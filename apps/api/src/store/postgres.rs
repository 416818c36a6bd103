use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{Store, TableCounts, ALREADY_APPLIED};
use crate::errors::AppError;
use crate::models::application::{
    Application, ApplicationDetail, ApplicationWithJob, NewApplication,
};
use crate::models::job::{Job, JobInput};
use crate::models::notification::{AdminNotificationRow, NewNotification, Notification};
use crate::models::user::{NewProfile, ProfileUpdate, Role, UserProfile};

/// PostgreSQL-backed store. Change events come from the row triggers, not from here.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct DetailRow {
    application: Json<Application>,
    job: Json<Job>,
    applicant: Json<UserProfile>,
}

impl From<DetailRow> for ApplicationDetail {
    fn from(row: DetailRow) -> Self {
        ApplicationDetail {
            application: row.application.0,
            job: row.job.0,
            applicant: row.applicant.0,
        }
    }
}

#[derive(FromRow)]
struct WithJobRow {
    application: Json<Application>,
    job: Json<Job>,
}

const DETAIL_SELECT: &str = r#"
    SELECT to_jsonb(a) AS application, to_jsonb(j) AS job, to_jsonb(u) AS applicant
    FROM applications a
    JOIN jobs j ON j.id = a.job_id
    JOIN users u ON u.id = a.user_id
"#;

#[async_trait]
impl Store for PgStore {
    async fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>, AppError> {
        Ok(
            sqlx::query_as::<_, UserProfile>("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<UserProfile, AppError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        Ok(sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO users (id, username, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id
            RETURNING *
            "#,
        )
        .bind(profile.id)
        .bind(&profile.username)
        .bind(&profile.email)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<UserProfile>, AppError> {
        Ok(sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE users SET
                username     = COALESCE($2, username),
                role         = COALESCE($3, role),
                country      = COALESCE($4, country),
                country_code = COALESCE($5, country_code),
                avatar_url   = COALESCE($6, avatar_url)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.username)
        .bind(update.role)
        .bind(update.country)
        .bind(update.country_code)
        .bind(update.avatar_url)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_profiles(&self, role: Option<Role>) -> Result<Vec<UserProfile>, AppError> {
        Ok(sqlx::query_as::<_, UserProfile>(
            "SELECT * FROM users WHERE ($1::user_role IS NULL OR role = $1) ORDER BY created_at DESC",
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delete_profile(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, AppError> {
        Ok(
            sqlx::query_as::<_, Job>("SELECT * FROM jobs ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, AppError> {
        Ok(sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn jobs_posted_by(&self, user_id: Uuid) -> Result<Vec<Job>, AppError> {
        Ok(sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE posted_by = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_job(&self, posted_by: Uuid, input: JobInput) -> Result<Job, AppError> {
        Ok(sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs
                (posted_by, title, company_name, location, country, job_type, salary_range, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(posted_by)
        .bind(input.title)
        .bind(input.company_name)
        .bind(input.location)
        .bind(input.country)
        .bind(input.job_type)
        .bind(input.salary_range)
        .bind(input.description)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_job(&self, id: Uuid, input: JobInput) -> Result<Option<Job>, AppError> {
        Ok(sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET
                title = $2, company_name = $3, location = $4, country = $5,
                job_type = $6, salary_range = $7, description = $8, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.title)
        .bind(input.company_name)
        .bind(input.location)
        .bind(input.country)
        .bind(input.job_type)
        .bind(input.salary_range)
        .bind(input.description)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_application(
        &self,
        job_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Application>, AppError> {
        Ok(sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE job_id = $1 AND user_id = $2",
        )
        .bind(job_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_application(&self, new: NewApplication) -> Result<Application, AppError> {
        let inserted = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (job_id, user_id, cover_letter, resume_url)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new.job_id)
        .bind(new.user_id)
        .bind(new.cover_letter)
        .bind(new.resume_url)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(application) => Ok(application),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::Conflict(ALREADY_APPLIED.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn application_detail(&self, id: Uuid) -> Result<Option<ApplicationDetail>, AppError> {
        let row = sqlx::query_as::<_, DetailRow>(&format!("{DETAIL_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, AppError> {
        Ok(
            sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn applications_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ApplicationWithJob>, AppError> {
        let rows = sqlx::query_as::<_, WithJobRow>(
            r#"
            SELECT to_jsonb(a) AS application, to_jsonb(j) AS job
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE a.user_id = $1
            ORDER BY a.applied_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ApplicationWithJob {
                application: row.application.0,
                job: row.job.0,
            })
            .collect())
    }

    async fn applications_for_job(
        &self,
        job_id: Uuid,
    ) -> Result<Vec<ApplicationDetail>, AppError> {
        let rows = sqlx::query_as::<_, DetailRow>(&format!(
            "{DETAIL_SELECT} WHERE a.job_id = $1 ORDER BY a.applied_at DESC"
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_applications(&self) -> Result<Vec<ApplicationDetail>, AppError> {
        let rows =
            sqlx::query_as::<_, DetailRow>(&format!("{DETAIL_SELECT} ORDER BY a.applied_at DESC"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_application(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_notifications_for(&self, user_id: Uuid) -> Result<Vec<Notification>, AppError> {
        Ok(sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 OR user_id IS NULL
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>, AppError> {
        Ok(
            sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_all_notifications(&self) -> Result<Vec<AdminNotificationRow>, AppError> {
        Ok(sqlx::query_as::<_, AdminNotificationRow>(
            r#"
            SELECT n.*,
                   u.username AS recipient_username,
                   u.email    AS recipient_email,
                   j.title    AS job_title
            FROM notifications n
            LEFT JOIN users u ON u.id = n.user_id
            LEFT JOIN jobs j ON j.id = n.job_id
            ORDER BY n.created_at DESC, n.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count_unread(&self, user_id: Uuid) -> Result<i64, AppError> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = false",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn insert_notification(
        &self,
        new: NewNotification,
    ) -> Result<Option<Notification>, AppError> {
        Ok(sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, job_id, application_id, message, kind)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (application_id, user_id) WHERE kind = 'new_application' DO NOTHING
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.job_id)
        .bind(new.application_id)
        .bind(new.message)
        .bind(new.kind)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
        include_broadcast: bool,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET read = true
            WHERE id = $1 AND (user_id = $2 OR ($3 AND user_id IS NULL))
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(include_broadcast)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result =
            sqlx::query("UPDATE notifications SET read = true WHERE user_id = $1 AND read = false")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn counts(&self) -> Result<TableCounts, AppError> {
        Ok(sqlx::query_as::<_, TableCounts>(
            r#"
            SELECT (SELECT COUNT(*) FROM users)         AS users,
                   (SELECT COUNT(*) FROM jobs)          AS jobs,
                   (SELECT COUNT(*) FROM applications)  AS applications,
                   (SELECT COUNT(*) FROM notifications) AS notifications
            "#,
        )
        .fetch_one(&self.pool)
        .await?)
    }
}
