//! Defines routes for the profile image API.
//!
//! ## Structure
//! - `GET  /healthz`, `GET /readyz`: probes
//! - `GET  /api/hello`: deployment smoke check
//! - `POST /api/profileImg`: multipart upload (`imgFile`, `userId`)
//! - `GET  /api/profileImg/{id}`: download the user's current image

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        profile_handlers::{download_profile_image, hello, upload_profile_image},
    },
    services::profile_service::ProfileImageService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the router; handlers share a `ProfileImageService`.
pub fn routes() -> Router<ProfileImageService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/hello", get(hello))
        .route("/api/profileImg", post(upload_profile_image))
        .route("/api/profileImg/{id}", get(download_profile_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
