//! Video catalog service: uploads video binaries to an object store and
//! keeps their descriptive metadata in a SQLite repository.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

use axum::Router;
use services::video_service::VideoService;
use tower_http::trace::TraceLayer;

/// The complete HTTP application with `service` as shared state.
pub fn build_router(service: VideoService, max_upload_bytes: usize) -> Router {
    routes::routes::routes(max_upload_bytes)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
