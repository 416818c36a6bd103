use axum::{
    extract::{Multipart, State},
    Json,
};

use super::AvatarFile;
use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::models::user::{ProfileUpdate, UserProfile};
use crate::state::AppState;

/// GET /api/v1/profile
pub async fn handle_get_profile(auth: AuthContext) -> Json<UserProfile> {
    Json(auth.profile)
}

/// PATCH /api/v1/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = super::edit_profile(state.store.as_ref(), &auth, update).await?;
    Ok(Json(profile))
}

/// POST /api/v1/profile/avatar
///
/// Multipart form with a single `avatar` file field.
pub async fn handle_upload_avatar(
    State(state): State<AppState>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> Result<Json<UserProfile>, AppError> {
    let mut avatar = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("avatar") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("avatar").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read avatar: {e}")))?;
        avatar = Some(AvatarFile::new(
            auth.user_id,
            &file_name,
            content_type.as_deref(),
            data,
        )?);
    }
    let avatar =
        avatar.ok_or_else(|| AppError::Validation("Missing 'avatar' file field".to_string()))?;

    let profile = super::store_avatar(
        state.store.as_ref(),
        &state.s3,
        &state.config.s3_bucket,
        &state.config.s3_public_url,
        &auth,
        avatar,
    )
    .await?;
    Ok(Json(profile))
}
