use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::job::Job;
use crate::models::user::UserProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub user_id: Uuid,
    /// Absent in change-feed payloads, which omit the letter.
    #[serde(default)]
    pub cover_letter: String,
    pub resume_url: Option<String>,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub cover_letter: String,
    pub resume_url: Option<String>,
}

/// An application joined with its job and applicant profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDetail {
    pub application: Application,
    pub job: Job,
    pub applicant: UserProfile,
}

/// An applicant's own view: the application with the job it targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationWithJob {
    pub application: Application,
    pub job: Job,
}
