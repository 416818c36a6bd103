use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{AnnouncementRequest, PlatformStats};
use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::models::application::ApplicationDetail;
use crate::models::job::Job;
use crate::models::notification::{AdminNotificationRow, Notification};
use crate::models::user::{Role, UserProfile};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RoleQuery {
    pub role: Option<Role>,
}

/// GET /api/v1/admin/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<PlatformStats>, AppError> {
    auth.require_admin()?;
    Ok(Json(super::platform_stats(state.store.as_ref()).await?))
}

/// GET /api/v1/admin/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<RoleQuery>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    auth.require_admin()?;
    Ok(Json(state.store.list_profiles(params.role).await?))
}

/// DELETE /api/v1/admin/users/:id
pub async fn handle_delete_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;
    super::remove_user(state.store.as_ref(), &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Job>>, AppError> {
    auth.require_admin()?;
    Ok(Json(state.store.list_jobs().await?))
}

/// GET /api/v1/admin/applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<ApplicationDetail>>, AppError> {
    auth.require_admin()?;
    Ok(Json(state.store.list_applications().await?))
}

/// GET /api/v1/admin/notifications
pub async fn handle_list_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<AdminNotificationRow>>, AppError> {
    auth.require_admin()?;
    Ok(Json(state.store.list_all_notifications().await?))
}

/// POST /api/v1/admin/notifications
pub async fn handle_create_announcement(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<AnnouncementRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    auth.require_admin()?;
    let created = super::announce(state.store.as_ref(), req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
