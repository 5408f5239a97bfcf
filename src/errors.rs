use crate::services::video_service::VideoError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// An HTTP-facing error: a status code plus a message safe to show clients.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

/// The single place workflow errors become status codes.
///
/// Validation messages are passed through; upstream failures are logged
/// here with their source and reach the client only as a generic message.
impl From<VideoError> for AppError {
    fn from(err: VideoError) -> Self {
        let status = match &err {
            VideoError::InvalidFormat { .. }
            | VideoError::InvalidIdentifier(_)
            | VideoError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            VideoError::NotFound(_) => StatusCode::NOT_FOUND,
            VideoError::UploadFailed(_) | VideoError::StorageDeleteFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            VideoError::PersistFailed(_)
            | VideoError::UpdateFailed(_)
            | VideoError::DeleteFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            VideoError::RepositoryUnavailable(_) | VideoError::StorageUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        if status.is_server_error() {
            tracing::error!(error = ?err, "request failed: {}", err);
        }

        match err {
            VideoError::NotFound(_) => AppError::new(status, "Video not found"),
            VideoError::InvalidIdentifier(_) => AppError::new(status, "Invalid video id"),
            other => AppError::new(status, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::video_id::VideoId,
        services::{object_storage::StorageError, video_repository::RepositoryError},
    };

    fn status_of(err: VideoError) -> StatusCode {
        AppError::from(err).status
    }

    #[test]
    fn workflow_errors_map_to_statuses() {
        let db = || RepositoryError::Database(sqlx::Error::PoolTimedOut);
        let s3 = || StorageError::Unavailable("down".into());

        assert_eq!(
            status_of(VideoError::InvalidFormat { filename: "a.txt".into() }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(VideoError::InvalidIdentifier("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(VideoError::NotFound(VideoId::generate())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(VideoError::UploadFailed(s3())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_of(VideoError::StorageDeleteFailed(s3())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_of(VideoError::PersistFailed(db())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_of(VideoError::UpdateFailed(db())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_of(VideoError::DeleteFailed(db())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status_of(VideoError::RepositoryUnavailable(db())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(VideoError::StorageUnavailable(s3())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn server_errors_do_not_leak_sources() {
        let err = AppError::from(VideoError::PersistFailed(RepositoryError::CorruptRecord {
            id: "abc".into(),
            reason: "secret detail".into(),
        }));
        assert!(!err.message.contains("secret detail"));
    }
}
