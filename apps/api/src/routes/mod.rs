pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::profiles::handlers as profiles;
use crate::settings::handlers as settings;
use crate::state::AppState;

/// Headroom above the file limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Profiles
        .route("/api/v1/profiles", get(profiles::handle_list_profiles))
        .route("/api/v1/profiles/:id", get(profiles::handle_get_profile))
        .route(
            "/api/v1/profiles/:id/cv/preview",
            post(profiles::handle_cv_preview),
        )
        .route(
            "/api/v1/profiles/:id/skills",
            put(profiles::handle_update_skills),
        )
        // Settings
        .route(
            "/api/v1/settings",
            get(settings::handle_get_settings).put(settings::handle_update_settings),
        )
        .route("/api/v1/settings/taxonomy", get(settings::handle_get_taxonomy))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
