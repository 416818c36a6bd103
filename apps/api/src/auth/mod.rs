//! Identity: bearer JWTs issued by the auth provider, and the per-request
//! `AuthContext` (claims plus the lazily created profile).

pub mod jwt;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{NewProfile, Role, UserProfile};
use crate::state::AppState;
use crate::store::Store;

pub use jwt::{Claims, JwtVerifier};

/// The authenticated caller. Built once per request or WebSocket session and
/// passed by reference; never stored globally.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub profile: UserProfile,
}

impl AuthContext {
    /// Resolves the caller's profile, creating it on first sight.
    pub async fn establish(store: &dyn Store, claims: Claims) -> Result<Self, AppError> {
        let profile = match store.get_profile(claims.sub).await? {
            Some(profile) => profile,
            None => {
                info!("No profile for user {}, creating one", claims.sub);
                store
                    .create_profile(NewProfile::from_identity(
                        claims.sub,
                        claims.email.as_deref(),
                    ))
                    .await?
            }
        };
        Ok(Self {
            user_id: claims.sub,
            email: claims.email,
            profile,
        })
    }

    pub async fn from_token(state: &AppState, token: &str) -> Result<Self, AppError> {
        let claims = state.jwt.verify(token)?;
        Self::establish(state.store.as_ref(), claims).await
    }

    pub fn role(&self) -> Role {
        self.profile.role
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role()) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_role(&[Role::Admin])
    }

    /// Row ownership: the owner or any admin.
    pub fn require_owner_or_admin(&self, owner: Uuid) -> Result<(), AppError> {
        if self.user_id == owner || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        AuthContext::from_token(state, token).await
    }
}
