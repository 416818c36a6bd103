use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Remote,
    #[sqlx(rename = "on-site")]
    #[serde(rename = "on-site")]
    OnSite,
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub posted_by: Uuid,
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub country: Option<String>,
    pub job_type: JobType,
    pub salary_range: Option<String>,
    /// Rich-text HTML as submitted by the poster.
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of job create and edit requests.
#[derive(Debug, Clone, Deserialize)]
pub struct JobInput {
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub country: Option<String>,
    pub job_type: JobType,
    pub salary_range: Option<String>,
    pub description: String,
}

impl JobInput {
    /// In-process row construction; Postgres fills ids and timestamps itself.
    #[cfg(test)]
    pub fn into_job(self, posted_by: Uuid, now: DateTime<Utc>) -> Job {
        Job {
            id: Uuid::new_v4(),
            posted_by,
            title: self.title,
            company_name: self.company_name,
            location: self.location,
            country: self.country,
            job_type: self.job_type,
            salary_range: self.salary_range,
            description: self.description,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        for (field, value) in [
            ("title", &self.title),
            ("company_name", &self.company_name),
            ("location", &self.location),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{field} cannot be empty")));
            }
        }
        if is_blank_rich_text(&self.description) {
            return Err(AppError::Validation(
                "Job description is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// True when stripping markup leaves no text, e.g. an editor's empty `<p><br></p>`.
pub fn is_blank_rich_text(html: &str) -> bool {
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag && !c.is_whitespace() => return false,
            _ => {}
        }
    }
    true
}
