//! Job postings: creation, ownership-checked edits, and listings.

pub mod handlers;

use tracing::info;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::models::job::{Job, JobInput};
use crate::models::user::ProfileUpdate;
use crate::store::Store;

/// Creates a job for the caller. A poster without a profile country
/// inherits the job's country.
pub async fn post_job(
    store: &dyn Store,
    auth: &AuthContext,
    input: JobInput,
) -> Result<Job, AppError> {
    if !auth.role().posts_jobs() {
        return Err(AppError::Forbidden);
    }
    input.validate()?;

    let job = store.create_job(auth.user_id, input).await?;
    info!(job_id = %job.id, posted_by = %job.posted_by, "job posted");

    let has_country = auth
        .profile
        .country
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());
    if let (false, Some(country)) = (has_country, job.country.clone()) {
        store
            .update_profile(
                auth.user_id,
                ProfileUpdate {
                    country: Some(country),
                    ..Default::default()
                },
            )
            .await?;
    }
    Ok(job)
}

/// Loads a job the caller may modify.
pub async fn owned_job(store: &dyn Store, auth: &AuthContext, id: Uuid) -> Result<Job, AppError> {
    let job = store
        .get_job(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    auth.require_owner_or_admin(job.posted_by)?;
    Ok(job)
}

pub async fn edit_job(
    store: &dyn Store,
    auth: &AuthContext,
    id: Uuid,
    input: JobInput,
) -> Result<Job, AppError> {
    owned_job(store, auth, id).await?;
    input.validate()?;
    store
        .update_job(id, input)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

pub async fn remove_job(store: &dyn Store, auth: &AuthContext, id: Uuid) -> Result<(), AppError> {
    owned_job(store, auth, id).await?;
    if !store.delete_job(id).await? {
        return Err(AppError::NotFound(format!("Job {id} not found")));
    }
    info!(job_id = %id, deleted_by = %auth.user_id, "job deleted");
    Ok(())
}
