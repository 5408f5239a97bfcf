//! Defines routes for the video metadata API.
//!
//! ## Structure
//! - **Collection endpoints** (`/api/v1/videos`)
//!   - `GET    /api/v1/videos`            list video summaries
//!   - `POST   /api/v1/videos`            upload a video (multipart)
//!   - `POST   /api/v1/videos/prueba-s3`  object store connectivity check
//!
//! - **Item endpoints**
//!   - `GET    /api/v1/videos/{id}` full record
//!   - `PUT    /api/v1/videos/{id}` patch descriptive fields
//!   - `DELETE /api/v1/videos/{id}` delete binary and record
//!
//! - **Health**: `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        video_handlers::{
            create_video, delete_video, get_video, list_videos, probe_storage, update_video,
        },
    },
    services::video_service::VideoService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Versioned prefix for every video endpoint.
pub const VIDEOS_PREFIX: &str = "/api/v1/videos";

/// Build the router for all video and health routes.
///
/// `max_upload_bytes` bounds request bodies so whole videos can be accepted
/// while still rejecting runaway uploads.
pub fn routes(max_upload_bytes: usize) -> Router<VideoService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Collection routes
        .route(VIDEOS_PREFIX, get(list_videos).post(create_video))
        .route(&format!("{}/prueba-s3", VIDEOS_PREFIX), post(probe_storage))
        // Item routes
        .route(
            &format!("{}/{{id}}", VIDEOS_PREFIX),
            get(get_video).put(update_video).delete(delete_video),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
