use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The role field is the entire authorization model.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    JobSeeker,
    Recruiter,
    Employer,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::JobSeeker, Role::Recruiter, Role::Employer, Role::Admin];

    /// Roles whose dashboard loads the jobs they posted (and so watches applications).
    pub fn posts_jobs(self) -> bool {
        matches!(self, Role::Recruiter | Role::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile created on first authenticated request.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
}

impl NewProfile {
    /// Username defaults to the local part of the email address.
    pub fn from_identity(id: Uuid, email: Option<&str>) -> Self {
        let username = email
            .and_then(|e| e.split('@').next())
            .filter(|local| !local.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("user_{}", Utc::now().timestamp_millis()));
        Self {
            id,
            username,
            email: email.map(str::to_string),
        }
    }
}

/// Partial profile update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub role: Option<Role>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    #[serde(skip)]
    pub avatar_url: Option<String>,
}
