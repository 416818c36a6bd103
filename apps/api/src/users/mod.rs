//! Profiles: the caller's own record, edits, and avatar storage.

pub mod handlers;

use std::path::Path;

use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::models::user::{ProfileUpdate, Role, UserProfile};
use crate::store::Store;

pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;
const AVATAR_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Applies a self-service profile edit. Only an admin may grant the admin role.
pub async fn edit_profile(
    store: &dyn Store,
    auth: &AuthContext,
    mut update: ProfileUpdate,
) -> Result<UserProfile, AppError> {
    if let Some(username) = update.username.as_mut() {
        let trimmed = username.trim().to_string();
        if trimmed.is_empty() {
            return Err(AppError::Validation("username cannot be empty".to_string()));
        }
        *username = trimmed;
    }
    if update.role == Some(Role::Admin) && !auth.is_admin() {
        return Err(AppError::Forbidden);
    }
    update.avatar_url = None;

    store
        .update_profile(auth.user_id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", auth.user_id)))
}

/// Validated avatar upload, ready to store.
#[derive(Debug)]
pub struct AvatarFile {
    pub key: String,
    pub content_type: String,
    pub data: Bytes,
}

impl AvatarFile {
    pub fn new(
        user_id: Uuid,
        file_name: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<Self, AppError> {
        if data.is_empty() {
            return Err(AppError::Validation("Avatar file is empty".to_string()));
        }
        if data.len() > MAX_AVATAR_BYTES {
            return Err(AppError::Validation(
                "File too large. Maximum size is 2MB".to_string(),
            ));
        }
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !AVATAR_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AppError::Validation(
                "Invalid file type. Only PNG, JPG, GIF, WEBP images are allowed".to_string(),
            ));
        }
        let content_type = content_type
            .filter(|ct| ct.starts_with("image/"))
            .map(str::to_string)
            .unwrap_or_else(|| match extension.as_str() {
                "jpg" => "image/jpeg".to_string(),
                other => format!("image/{other}"),
            });

        Ok(Self {
            key: format!(
                "avatars/{}/{}.{}",
                user_id,
                Utc::now().timestamp_millis(),
                extension
            ),
            content_type,
            data,
        })
    }

    pub fn public_url(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.key)
    }
}

/// Uploads the avatar and records its public URL on the caller's profile.
pub async fn store_avatar(
    store: &dyn Store,
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    public_base: &str,
    auth: &AuthContext,
    avatar: AvatarFile,
) -> Result<UserProfile, AppError> {
    let url = avatar.public_url(public_base);
    s3.put_object()
        .bucket(bucket)
        .key(&avatar.key)
        .body(ByteStream::from(avatar.data))
        .content_type(avatar.content_type)
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("Avatar upload failed: {e}")))?;
    info!("Uploaded avatar to s3://{}/{}", bucket, avatar.key);

    store
        .update_profile(
            auth.user_id,
            ProfileUpdate {
                avatar_url: Some(url),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", auth.user_id)))
}
