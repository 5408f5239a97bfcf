//! src/services/local_storage.rs
//!
//! LocalStorage: an `ObjectStorage` backend on the local filesystem, used
//! for development and tests. Payloads are sharded beneath
//! `base_path/{shard}/{shard}/{key}` to keep directory fan-out small.

use super::object_storage::{ObjectStorage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;

#[derive(Clone, Debug)]
pub struct LocalStorage {
    /// Root directory for object payloads. Plays the role of the bucket.
    base_path: PathBuf,

    /// Prefix used to build object URLs.
    base_url: String,

    /// Display name reported by `bucket()`.
    name: String,
}

impl LocalStorage {
    /// Create the root directory if needed and return the backend.
    pub async fn new(base_path: impl Into<PathBuf>, base_url: Option<String>) -> StorageResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;

        let base_url = base_url
            .unwrap_or_else(|| format!("file://{}", base_path.display()))
            .trim_end_matches('/')
            .to_string();
        let name = base_path.display().to_string();

        Ok(Self {
            base_path,
            base_url,
            name,
        })
    }

    /// Reject keys that could escape `base_path`. Dots inside a segment are
    /// fine; only whole `.` or `..` segments are refused.
    fn ensure_key_safe(&self, key: &str) -> StorageResult<()> {
        let unsafe_key = key.is_empty()
            || key.len() > MAX_OBJECT_KEY_LEN
            || key.starts_with('/')
            || key.split('/').any(|segment| segment == ".." || segment == ".")
            || key.bytes().any(|b| b.is_ascii_control() || b == b'\\');
        if unsafe_key {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    /// Two-level shard names from MD5(key), as lowercase hex (00–ff).
    fn object_shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// Remove empty directories from `start` up to (not including) `stop`.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    /// Write to a temp file, fsync, then rename into place so a failed
    /// write never leaves a partial object at `key`.
    async fn put(&self, key: &str, content: Bytes, _content_type: &str) -> StorageResult<String> {
        self.ensure_key_safe(key)?;

        let file_path = self.object_path(key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent)
            .await
            .map_err(|err| StorageError::WriteFailed(err.to_string()))?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let write = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(&content).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, &file_path).await
        };
        if let Err(err) = write.await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::WriteFailed(err.to_string()));
        }

        debug!(key = %key, size_bytes = content.len(), "stored object on disk");
        Ok(self.object_url(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.ensure_key_safe(key)?;

        let file_path = self.object_path(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(StorageError::Unavailable(err.to_string())),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent, &self.base_path).await;
        }

        Ok(())
    }

    /// Write, read back and remove a probe file under `base_path`.
    async fn head_bucket(&self) -> StorageResult<()> {
        let probe = self.base_path.join(format!(".probe-{}", Uuid::new_v4()));
        let result = async {
            fs::write(&probe, b"probe").await?;
            let bytes = fs::read(&probe).await?;
            if bytes != b"probe" {
                return Err(io::Error::new(ErrorKind::InvalidData, "probe content mismatch"));
            }
            Ok(())
        }
        .await;

        let _ = fs::remove_file(&probe).await;
        result.map_err(|err| {
            StorageError::Unavailable(format!("{}: {}", self.base_path.display(), err))
        })
    }

    fn bucket(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), Some("http://localhost/objects/".into()))
            .await
            .unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn put_writes_payload_and_returns_url() {
        let (_dir, storage) = storage().await;
        let key = "videos/abc_clip.mp4";

        let url = storage
            .put(key, Bytes::from_static(b"0123456789"), "video/mp4")
            .await
            .unwrap();

        assert_eq!(url, "http://localhost/objects/videos/abc_clip.mp4");
        let on_disk = fs::read(storage.object_path(key)).await.unwrap();
        assert_eq!(on_disk, b"0123456789");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, storage) = storage().await;
        let key = "videos/abc_clip.mp4";
        storage.put(key, Bytes::from_static(b"x"), "video/mp4").await.unwrap();

        storage.delete(key).await.unwrap();
        assert!(!storage.object_path(key).exists());
        storage.delete(key).await.unwrap();
        storage.delete("videos/never-written.mp4").await.unwrap();
    }

    #[tokio::test]
    async fn delete_prunes_empty_shard_directories() {
        let (dir, storage) = storage().await;
        let key = "videos/abc_clip.mp4";
        storage.put(key, Bytes::from_static(b"x"), "video/mp4").await.unwrap();
        storage.delete(key).await.unwrap();

        let mut entries = fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unsafe_keys_are_rejected() {
        let (_dir, storage) = storage().await;
        for key in ["", "/etc/passwd", "videos/../../x", "videos/./x", "a\\b"] {
            let err = storage.put(key, Bytes::new(), "video/mp4").await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "{key}");
        }
    }

    #[tokio::test]
    async fn dots_inside_a_segment_are_allowed() {
        let (_dir, storage) = storage().await;
        let key = "videos/abc_my..clip.mp4";

        storage.put(key, Bytes::from_static(b"x"), "video/mp4").await.unwrap();
        assert!(storage.object_path(key).exists());
        storage.delete(key).await.unwrap();
    }

    #[tokio::test]
    async fn head_bucket_succeeds_on_writable_dir() {
        let (_dir, storage) = storage().await;
        storage.head_bucket().await.unwrap();
    }
}
