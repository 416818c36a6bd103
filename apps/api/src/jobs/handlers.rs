use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::models::job::{Job, JobInput};
use crate::state::AppState;

/// GET /api/v1/jobs
pub async fn handle_list_jobs(State(state): State<AppState>) -> Result<Json<Vec<Job>>, AppError> {
    Ok(Json(state.store.list_jobs().await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .store
        .get_job(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok(Json(job))
}

/// GET /api/v1/jobs/mine
pub async fn handle_my_jobs(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Job>>, AppError> {
    Ok(Json(state.store.jobs_posted_by(auth.user_id).await?))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(input): Json<JobInput>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let job = super::post_job(state.store.as_ref(), &auth, input).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// PUT /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(input): Json<JobInput>,
) -> Result<Json<Job>, AppError> {
    let job = super::edit_job(state.store.as_ref(), &auth, id, input).await?;
    Ok(Json(job))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    super::remove_job(state.store.as_ref(), &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
