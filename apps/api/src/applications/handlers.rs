use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::ApplyRequest;
use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::models::application::{Application, ApplicationDetail, ApplicationWithJob};
use crate::state::AppState;

/// POST /api/v1/jobs/:id/apply
pub async fn handle_apply(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(job_id): Path<Uuid>,
    Json(req): Json<ApplyRequest>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    let application = super::submit_application(state.store.as_ref(), &auth, job_id, req).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /api/v1/jobs/:id/applications
pub async fn handle_job_applications(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Vec<ApplicationDetail>>, AppError> {
    let rows = super::job_applications(state.store.as_ref(), &auth, job_id).await?;
    Ok(Json(rows))
}

/// GET /api/v1/applications/mine
pub async fn handle_my_applications(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<ApplicationWithJob>>, AppError> {
    Ok(Json(state.store.applications_for_user(auth.user_id).await?))
}

/// DELETE /api/v1/applications/:id
pub async fn handle_delete_application(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    super::withdraw_application(state.store.as_ref(), &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
