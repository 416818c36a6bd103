pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::admin::handlers as admin;
use crate::applications::handlers as applications;
use crate::jobs::handlers as jobs;
use crate::notifications::handlers as notifications;
use crate::state::AppState;
use crate::users::{handlers as users, MAX_AVATAR_BYTES};

/// Multipart framing on top of the largest accepted avatar.
const AVATAR_BODY_LIMIT: usize = MAX_AVATAR_BYTES + 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/mine", get(jobs::handle_my_jobs))
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        // Applications
        .route("/api/v1/jobs/:id/apply", post(applications::handle_apply))
        .route(
            "/api/v1/jobs/:id/applications",
            get(applications::handle_job_applications),
        )
        .route(
            "/api/v1/applications/mine",
            get(applications::handle_my_applications),
        )
        .route(
            "/api/v1/applications/:id",
            axum::routing::delete(applications::handle_delete_application),
        )
        // Profile
        .route(
            "/api/v1/profile",
            get(users::handle_get_profile).patch(users::handle_update_profile),
        )
        .route(
            "/api/v1/profile/avatar",
            post(users::handle_upload_avatar).layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
        // Notifications
        .route(
            "/api/v1/notifications",
            get(notifications::handle_list_notifications),
        )
        .route(
            "/api/v1/notifications/unread-count",
            get(notifications::handle_unread_count),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(notifications::handle_mark_all_read),
        )
        .route(
            "/api/v1/notifications/:id/read",
            post(notifications::handle_mark_read),
        )
        .route(
            "/api/v1/notifications/ws",
            get(notifications::handle_notifications_ws),
        )
        // Admin
        .route("/api/v1/admin/stats", get(admin::handle_stats))
        .route("/api/v1/admin/users", get(admin::handle_list_users))
        .route(
            "/api/v1/admin/users/:id",
            axum::routing::delete(admin::handle_delete_user),
        )
        .route("/api/v1/admin/jobs", get(admin::handle_list_jobs))
        .route(
            "/api/v1/admin/applications",
            get(admin::handle_list_applications),
        )
        .route(
            "/api/v1/admin/notifications",
            get(admin::handle_list_notifications).post(admin::handle_create_announcement),
        )
        .with_state(state)
}
