pub mod handlers;

use tracing::info;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::models::application::{Application, ApplicationDetail, NewApplication};
use crate::models::job::is_blank_rich_text;
use crate::store::{Store, ALREADY_APPLIED};

#[derive(Debug, serde::Deserialize)]
pub struct ApplyRequest {
    pub cover_letter: String,
    #[serde(default)]
    pub resume_url: Option<String>,
}

/// Submits the caller's application to a job.
///
/// The early lookup gives the common case a clean error; the store's
/// uniqueness constraint is what actually rules out a second row.
pub async fn submit_application(
    store: &dyn Store,
    auth: &AuthContext,
    job_id: Uuid,
    req: ApplyRequest,
) -> Result<Application, AppError> {
    if is_blank_rich_text(&req.cover_letter) {
        return Err(AppError::Validation(
            "Cover letter is required".to_string(),
        ));
    }
    if store.get_job(job_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }
    if store.find_application(job_id, auth.user_id).await?.is_some() {
        return Err(AppError::Conflict(ALREADY_APPLIED.to_string()));
    }

    let application = store
        .insert_application(NewApplication {
            job_id,
            user_id: auth.user_id,
            cover_letter: req.cover_letter,
            resume_url: req.resume_url,
        })
        .await?;
    info!(
        application_id = %application.id,
        %job_id,
        applicant = %auth.user_id,
        "application submitted"
    );
    Ok(application)
}

/// Applications for a job, visible to its poster and admins.
pub async fn job_applications(
    store: &dyn Store,
    auth: &AuthContext,
    job_id: Uuid,
) -> Result<Vec<ApplicationDetail>, AppError> {
    crate::jobs::owned_job(store, auth, job_id).await?;
    store.applications_for_job(job_id).await
}

pub async fn withdraw_application(
    store: &dyn Store,
    auth: &AuthContext,
    id: Uuid,
) -> Result<(), AppError> {
    let application = store
        .get_application(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;
    auth.require_owner_or_admin(application.user_id)?;
    store.delete_application(id).await?;
    info!(application_id = %id, "application withdrawn");
    Ok(())
}
