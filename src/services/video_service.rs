//! src/services/video_service.rs
//!
//! VideoService: the ingestion, deletion, query and update workflows.
//!
//! The object store and the repository are not transactional with each
//! other. Ingestion uploads first and records second, deleting the upload
//! again if the record cannot be written. Deletion removes the binary first
//! and keeps the record whenever the binary could not be removed.

use crate::models::{
    format::VideoFormat,
    patch::VideoPatch,
    video::{CreatedVideo, NewVideo, VideoRecord, VideoSummary},
    video_id::VideoId,
};
use crate::services::{
    naming,
    object_storage::{ObjectStorage, StorageError},
    video_repository::{RepositoryError, VideoRepository},
};
use bytes::Bytes;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("unsupported file `{filename}`; allowed formats: {allowed}", allowed = VideoFormat::allowed_list())]
    InvalidFormat { filename: String },
    #[error("`{0}` is not a valid video id")]
    InvalidIdentifier(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("video `{0}` not found")]
    NotFound(VideoId),
    #[error("upload to object store failed")]
    UploadFailed(#[source] StorageError),
    #[error("saving video metadata failed")]
    PersistFailed(#[source] RepositoryError),
    #[error("deleting video binary failed")]
    StorageDeleteFailed(#[source] StorageError),
    #[error("metadata repository unavailable")]
    RepositoryUnavailable(#[source] RepositoryError),
    #[error("updating video metadata failed")]
    UpdateFailed(#[source] RepositoryError),
    #[error("deleting video metadata failed")]
    DeleteFailed(#[source] RepositoryError),
    #[error("object store unavailable")]
    StorageUnavailable(#[source] StorageError),
}

pub type VideoResult<T> = Result<T, VideoError>;

/// One uploaded file plus the caller's descriptive fields.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub display_name: String,
    pub flagged: bool,
    pub filename: String,
    /// MIME type sent with the file part, if any.
    pub content_type: Option<String>,
    pub content: Bytes,
}

/// Shared by every request; both clients are created once at startup.
#[derive(Clone)]
pub struct VideoService {
    storage: Arc<dyn ObjectStorage>,
    repository: Arc<dyn VideoRepository>,
}

impl VideoService {
    pub fn new(storage: Arc<dyn ObjectStorage>, repository: Arc<dyn VideoRepository>) -> Self {
        Self {
            storage,
            repository,
        }
    }

    /// Validate → upload → persist, compensating the upload if persisting fails.
    #[tracing::instrument(skip(self, request), fields(filename = %request.filename, size_bytes = request.content.len()))]
    pub async fn ingest(&self, request: IngestRequest) -> VideoResult<CreatedVideo> {
        let format = VideoFormat::from_filename(&request.filename).ok_or_else(|| {
            VideoError::InvalidFormat {
                filename: request.filename.clone(),
            }
        })?;
        let display_name = request.display_name.trim();
        if display_name.is_empty() {
            return Err(VideoError::InvalidRequest("nombreVideo is required".into()));
        }

        let storage_key = naming::storage_key(&request.filename);
        let content_type = request
            .content_type
            .as_deref()
            .filter(|ct| !ct.is_empty())
            .unwrap_or(format.content_type())
            .to_string();
        let size_bytes = request.content.len() as i64;

        let url = self
            .storage
            .put(&storage_key, request.content, &content_type)
            .await
            .map_err(VideoError::UploadFailed)?;

        let video = NewVideo {
            display_name: display_name.to_string(),
            storage_key,
            url,
            size_bytes,
            format,
            flagged: request.flagged,
            uploaded_at: Utc::now(),
            processed: false,
        };

        match self.repository.insert(&video).await {
            Ok(id) => {
                info!(video_id = %id, key = %video.storage_key, "video ingested");
                Ok(CreatedVideo::new(id, &video))
            }
            Err(err) => {
                error!(error = %err, key = %video.storage_key, "saving metadata failed; removing uploaded object");
                if let Err(cleanup_err) = self.storage.delete(&video.storage_key).await {
                    error!(
                        error = %cleanup_err,
                        key = %video.storage_key,
                        "compensating delete failed; object is orphaned"
                    );
                }
                Err(VideoError::PersistFailed(err))
            }
        }
    }

    /// Lookup → remove binary → remove record.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, raw_id: &str) -> VideoResult<()> {
        let id = parse_id(raw_id)?;

        let video = self
            .repository
            .find_by_id(&id)
            .await
            .map_err(VideoError::DeleteFailed)?
            .ok_or_else(|| VideoError::NotFound(id.clone()))?;

        self.storage
            .delete(&video.storage_key)
            .await
            .map_err(VideoError::StorageDeleteFailed)?;

        let deleted = self
            .repository
            .delete_by_id(&id)
            .await
            .map_err(VideoError::DeleteFailed)?;
        if deleted == 0 {
            warn!(video_id = %id, "record vanished before it could be deleted");
            return Err(VideoError::NotFound(id));
        }

        info!(video_id = %id, key = %video.storage_key, "video deleted");
        Ok(())
    }

    pub async fn list(&self) -> VideoResult<Vec<VideoSummary>> {
        self.repository
            .find_all()
            .await
            .map_err(VideoError::RepositoryUnavailable)
    }

    pub async fn get(&self, raw_id: &str) -> VideoResult<VideoRecord> {
        let id = parse_id(raw_id)?;
        self.repository
            .find_by_id(&id)
            .await
            .map_err(VideoError::RepositoryUnavailable)?
            .ok_or(VideoError::NotFound(id))
    }

    /// Apply a JSON patch; identity and storage fields are silently dropped.
    /// Nothing modified, whether the record is missing or already holds
    /// the patched values, is `NotFound`.
    pub async fn update(&self, raw_id: &str, body: Map<String, Value>) -> VideoResult<()> {
        let id = parse_id(raw_id)?;
        let patch =
            VideoPatch::from_json(body).map_err(|e| VideoError::InvalidRequest(e.to_string()))?;

        let modified = self
            .repository
            .update_by_id(&id, &patch)
            .await
            .map_err(VideoError::UpdateFailed)?;
        if modified == 0 {
            return Err(VideoError::NotFound(id));
        }
        Ok(())
    }

    /// Connectivity check against the object store.
    pub async fn probe_storage(&self) -> VideoResult<()> {
        self.storage
            .head_bucket()
            .await
            .map_err(VideoError::StorageUnavailable)
    }

    pub async fn probe_repository(&self) -> VideoResult<()> {
        self.repository
            .ping()
            .await
            .map_err(VideoError::RepositoryUnavailable)
    }

    pub fn bucket(&self) -> &str {
        self.storage.bucket()
    }
}

fn parse_id(raw: &str) -> VideoResult<VideoId> {
    VideoId::parse(raw).map_err(|e| VideoError::InvalidIdentifier(e.0))
}
