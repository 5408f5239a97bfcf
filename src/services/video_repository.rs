//! src/services/video_repository.rs
//!
//! The metadata repository: one `videos` table holding a `VideoRecord` per
//! uploaded binary. The trait is the seam the workflows depend on; the
//! SQLite implementation is what the service runs with.

use crate::models::{
    format::VideoFormat,
    patch::VideoPatch,
    video::{NewVideo, VideoRecord, VideoSummary},
    video_id::VideoId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{FromRow, SqlitePool, types::Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("stored record `{id}` is corrupt: {reason}")]
    CorruptRecord { id: String, reason: String },
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Persist a new record and return the identifier assigned to it.
    async fn insert(&self, video: &NewVideo) -> RepositoryResult<VideoId>;

    /// Summaries of every record, oldest first.
    async fn find_all(&self) -> RepositoryResult<Vec<VideoSummary>>;

    async fn find_by_id(&self, id: &VideoId) -> RepositoryResult<Option<VideoRecord>>;

    /// Apply `patch` and return the number of records it modified (0 or 1).
    ///
    /// A missing record and a patch that leaves every value as it was both
    /// report 0. Callers are expected to have stripped identity fields
    /// already; `VideoPatch` cannot carry them.
    async fn update_by_id(&self, id: &VideoId, patch: &VideoPatch) -> RepositoryResult<u64>;

    /// Delete the record and return the number removed (0 or 1).
    async fn delete_by_id(&self, id: &VideoId) -> RepositoryResult<u64>;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> RepositoryResult<()>;
}

const SELECT_BY_ID: &str = "SELECT id, display_name, storage_key, url, size_bytes, format,
        flagged, uploaded_at, processed, extra
 FROM videos WHERE id = ?";

/// SQLite-backed [`VideoRepository`].
#[derive(Clone)]
pub struct SqliteVideoRepository {
    db: SqlitePool,
}

#[derive(FromRow)]
struct VideoRow {
    id: VideoId,
    display_name: String,
    storage_key: String,
    url: String,
    size_bytes: i64,
    format: String,
    flagged: bool,
    uploaded_at: DateTime<Utc>,
    processed: bool,
    extra: Json<Map<String, Value>>,
}

impl TryFrom<VideoRow> for VideoRecord {
    type Error = RepositoryError;

    fn try_from(row: VideoRow) -> Result<Self, Self::Error> {
        let format = row
            .format
            .parse::<VideoFormat>()
            .map_err(|_| RepositoryError::CorruptRecord {
                id: row.id.to_string(),
                reason: format!("unknown format `{}`", row.format),
            })?;

        Ok(VideoRecord {
            id: row.id,
            display_name: row.display_name,
            storage_key: row.storage_key,
            url: row.url,
            size_bytes: row.size_bytes,
            format,
            flagged: row.flagged,
            uploaded_at: row.uploaded_at,
            processed: row.processed,
            extra: row.extra.0,
        })
    }
}

impl SqliteVideoRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoRepository for SqliteVideoRepository {
    async fn insert(&self, video: &NewVideo) -> RepositoryResult<VideoId> {
        let id = VideoId::generate();

        sqlx::query(
            "INSERT INTO videos (
                id, display_name, storage_key, url, size_bytes,
                format, flagged, uploaded_at, processed, extra
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, '{}')",
        )
        .bind(id.as_str())
        .bind(&video.display_name)
        .bind(&video.storage_key)
        .bind(&video.url)
        .bind(video.size_bytes)
        .bind(video.format.as_str())
        .bind(video.flagged)
        .bind(video.uploaded_at)
        .bind(video.processed)
        .execute(&self.db)
        .await?;

        Ok(id)
    }

    async fn find_all(&self) -> RepositoryResult<Vec<VideoSummary>> {
        let rows = sqlx::query_as::<_, VideoSummary>(
            "SELECT id, display_name, url, flagged, uploaded_at
             FROM videos ORDER BY rowid ASC",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: &VideoId) -> RepositoryResult<Option<VideoRecord>> {
        let row = sqlx::query_as::<_, VideoRow>(SELECT_BY_ID)
            .bind(id.as_str())
            .fetch_optional(&self.db)
            .await?;

        row.map(VideoRecord::try_from).transpose()
    }

    async fn update_by_id(&self, id: &VideoId, patch: &VideoPatch) -> RepositoryResult<u64> {
        if patch.is_empty() {
            return Ok(0);
        }

        let mut tx = self.db.begin().await?;
        let row = sqlx::query_as::<_, VideoRow>(SELECT_BY_ID)
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(0);
        };

        let mut record = VideoRecord::try_from(row)?;
        if !patch.apply_to(&mut record) {
            return Ok(0);
        }

        let result = sqlx::query(
            "UPDATE videos
             SET display_name = ?, flagged = ?, processed = ?, format = ?,
                 size_bytes = ?, extra = ?
             WHERE id = ?",
        )
        .bind(&record.display_name)
        .bind(record.flagged)
        .bind(record.processed)
        .bind(record.format.as_str())
        .bind(record.size_bytes)
        .bind(serde_json::to_string(&record.extra)?)
        .bind(id.as_str())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }

    async fn delete_by_id(&self, id: &VideoId) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM videos WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> RepositoryResult<()> {
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&self.db).await?;
        if one != 1 {
            return Err(RepositoryError::CorruptRecord {
                id: "-".into(),
                reason: format!("unexpected ping result: {}", one),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use serde_json::json;

    async fn repository() -> SqliteVideoRepository {
        SqliteVideoRepository::new(db::connect_in_memory().await.unwrap())
    }

    fn new_video(name: &str) -> NewVideo {
        NewVideo {
            display_name: name.into(),
            storage_key: format!("videos/{}_{}.mp4", uuid::Uuid::new_v4(), name),
            url: format!("https://b.s3.us-east-1.amazonaws.com/videos/{}.mp4", name),
            size_bytes: 10,
            format: VideoFormat::Mp4,
            flagged: false,
            uploaded_at: Utc::now(),
            processed: false,
        }
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let repo = repository().await;
        let video = new_video("lobby");

        let id = repo.insert(&video).await.unwrap();
        let record = repo.find_by_id(&id).await.unwrap().expect("record");

        assert_eq!(record.id, id);
        assert_eq!(record.display_name, video.display_name);
        assert_eq!(record.storage_key, video.storage_key);
        assert_eq!(record.url, video.url);
        assert_eq!(record.format, VideoFormat::Mp4);
        assert_eq!(record.uploaded_at, video.uploaded_at);
        assert!(!record.processed);
        assert!(record.extra.is_empty());
    }

    #[tokio::test]
    async fn find_all_returns_summaries_in_insertion_order() {
        let repo = repository().await;
        assert!(repo.find_all().await.unwrap().is_empty());

        let first = repo.insert(&new_video("first")).await.unwrap();
        let second = repo.insert(&new_video("second")).await.unwrap();

        let ids: Vec<_> = repo.find_all().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn find_by_unknown_id_is_none() {
        let repo = repository().await;
        let id = VideoId::parse("000000000000000000000000").unwrap();
        assert!(repo.find_by_id(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_applies_typed_fields_and_sets_extra_keys() {
        let repo = repository().await;
        let video = new_video("lobby");
        let id = repo.insert(&video).await.unwrap();

        let patch = VideoPatch::from_json(
            json!({
                "nombreVideo": "entrance",
                "anomalia": true,
                "url": "https://elsewhere",
                "camara": "norte",
            })
            .as_object()
            .cloned()
            .unwrap(),
        )
        .unwrap();
        assert_eq!(repo.update_by_id(&id, &patch).await.unwrap(), 1);

        let second = VideoPatch::from_json(json!({ "turno": 2 }).as_object().cloned().unwrap()).unwrap();
        assert_eq!(repo.update_by_id(&id, &second).await.unwrap(), 1);

        let record = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(record.display_name, "entrance");
        assert!(record.flagged);
        assert_eq!(record.url, video.url);
        assert_eq!(record.storage_key, video.storage_key);
        assert_eq!(record.uploaded_at, video.uploaded_at);
        assert_eq!(record.extra.get("camara"), Some(&json!("norte")));
        assert_eq!(record.extra.get("turno"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn update_reports_modified_count() {
        let repo = repository().await;
        let id = repo.insert(&new_video("lobby")).await.unwrap();
        let missing = VideoId::generate();

        let patch = VideoPatch {
            flagged: Some(true),
            ..Default::default()
        };
        assert_eq!(repo.update_by_id(&missing, &patch).await.unwrap(), 0);
        assert_eq!(repo.update_by_id(&id, &patch).await.unwrap(), 1);
        assert_eq!(repo.update_by_id(&id, &patch).await.unwrap(), 0);
        assert_eq!(repo.update_by_id(&id, &VideoPatch::default()).await.unwrap(), 0);

        let same_name = VideoPatch {
            display_name: Some("lobby".into()),
            ..Default::default()
        };
        assert_eq!(repo.update_by_id(&id, &same_name).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unchanged_update_leaves_record_intact() {
        let repo = repository().await;
        let id = repo.insert(&new_video("lobby")).await.unwrap();
        let extra = VideoPatch::from_json(json!({ "camara": "norte" }).as_object().cloned().unwrap()).unwrap();
        assert_eq!(repo.update_by_id(&id, &extra).await.unwrap(), 1);
        let before = repo.find_by_id(&id).await.unwrap().unwrap();

        assert_eq!(repo.update_by_id(&id, &extra).await.unwrap(), 0);
        assert_eq!(repo.find_by_id(&id).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn delete_reports_removed_count() {
        let repo = repository().await;
        let id = repo.insert(&new_video("lobby")).await.unwrap();

        assert_eq!(repo.delete_by_id(&id).await.unwrap(), 1);
        assert_eq!(repo.delete_by_id(&id).await.unwrap(), 0);
        assert!(repo.find_by_id(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ping_succeeds() {
        repository().await.ping().await.unwrap();
    }
}
