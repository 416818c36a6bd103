use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;

use crate::auth::JwtVerifier;
use crate::config::Config;
use crate::realtime::ChangeFeed;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Row-change events from the database, fanned out to dashboard sessions.
    pub changes: ChangeFeed,
    pub jwt: JwtVerifier,
    pub s3: S3Client,
    pub config: Config,
}
