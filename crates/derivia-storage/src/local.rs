use crate::keys::validate_key;
use crate::traits::{BlobStore, ObjectMetadata, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use derivia_core::ImageObject;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const METADATA_SUFFIX: &str = ".meta.json";

/// Local filesystem blob store
///
/// Objects live under `{base_path}/{bucket}/{key}` with their metadata in a
/// `{key}.meta.json` sidecar. Writes go to a temporary file that is renamed
/// into place, so a cancelled write never leaves a partial object behind.
#[derive(Clone)]
pub struct LocalStore {
    root: PathBuf,
    bucket: String,
}

impl LocalStore {
    /// Create a new LocalStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for all buckets (e.g., "/var/lib/derivia")
    /// * `bucket` - Bucket name, used as a subdirectory of `base_path`
    pub async fn new(base_path: impl Into<PathBuf>, bucket: String) -> StorageResult<Self> {
        let root = base_path.into().join(&bucket);

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(LocalStore { root, bucket })
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        if key.ends_with(METADATA_SUFFIX) {
            return Err(StorageError::InvalidKey(format!(
                "Storage key must not end with {}",
                METADATA_SUFFIX
            )));
        }
        Ok(self.root.join(key))
    }

    fn metadata_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(METADATA_SUFFIX);
        PathBuf::from(name)
    }

    async fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
        let tmp = path.with_file_name(format!(
            ".{}.{}.tmp",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Uuid::new_v4()
        ));

        let result = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            fs::rename(&tmp, path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp).await;
            return Err(StorageError::WriteFailed(format!(
                "Failed to write file {}: {}",
                path.display(),
                e
            )));
        }
        Ok(())
    }

    async fn read_metadata(path: &Path) -> StorageResult<ObjectMetadata> {
        match fs::read(Self::metadata_path(path)).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                StorageError::ReadFailed(format!(
                    "Corrupt metadata for {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ObjectMetadata::default()),
            Err(e) => Err(map_io_error(e, path, true)),
        }
    }
}

fn map_io_error(err: std::io::Error, path: &Path, read: bool) -> StorageError {
    let message = format!("{}: {}", path.display(), err);
    match err.kind() {
        ErrorKind::PermissionDenied => StorageError::AccessDenied(message),
        _ if read => StorageError::ReadFailed(message),
        _ => StorageError::WriteFailed(message),
    }
}

#[async_trait]
impl BlobStore for LocalStore {
    async fn get(&self, key: &str) -> StorageResult<Option<ImageObject>> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(map_io_error(e, &path, true)),
        };

        let metadata = Self::read_metadata(&path).await?;
        let last_modified = fs::metadata(&path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);

        tracing::info!(
            key = %key,
            size_bytes = data.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local get successful"
        );

        Ok(Some(ImageObject {
            key: key.to_string(),
            content_type: metadata.content_type,
            cache_control: metadata.cache_control,
            last_modified,
            data: Bytes::from(data),
        }))
    }

    async fn put(&self, key: &str, data: Bytes, metadata: ObjectMetadata) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| map_io_error(e, parent, false))?;
        }

        let sidecar = serde_json::to_vec(&metadata)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        // Sidecar first: once the object is visible its metadata is too.
        Self::write_atomic(&Self::metadata_path(&path), &sidecar).await?;
        Self::write_atomic(&path, &data).await?;

        tracing::info!(
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local put successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| map_io_error(e, &path, true))
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_store_put_get() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path(), "images".to_string())
            .await
            .unwrap();

        let metadata = ObjectMetadata {
            content_type: Some("image/png".to_string()),
            cache_control: Some("public, max-age=86400".to_string()),
        };
        store
            .put("photos/10x10/a.png", Bytes::from_static(b"png"), metadata)
            .await
            .unwrap();

        let object = store.get("photos/10x10/a.png").await.unwrap().unwrap();
        assert_eq!(object.data, Bytes::from_static(b"png"));
        assert_eq!(object.content_type.as_deref(), Some("image/png"));
        assert_eq!(
            object.cache_control.as_deref(),
            Some("public, max-age=86400")
        );
        assert!(object.last_modified.is_some());
        assert!(dir.path().join("images/photos/10x10/a.png").exists());
    }

    #[tokio::test]
    async fn test_local_store_missing_is_none() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path(), "images".to_string())
            .await
            .unwrap();

        assert!(store.get("nope.jpg").await.unwrap().is_none());
        assert!(!store.exists("nope.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_object_without_sidecar_has_no_content_type() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path(), "images".to_string())
            .await
            .unwrap();
        std::fs::write(dir.path().join("images/raw.jpg"), b"jpeg").unwrap();

        let object = store.get("raw.jpg").await.unwrap().unwrap();
        assert_eq!(object.content_type, None);
        assert!(store.exists("raw.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path(), "images".to_string())
            .await
            .unwrap();

        let result = store.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = store.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = store
            .put("a.jpg.meta.json", Bytes::new(), ObjectMetadata::default())
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path(), "images".to_string())
            .await
            .unwrap();

        for body in [&b"first"[..], &b"second"[..]] {
            store
                .put("a.jpg", Bytes::copy_from_slice(body), ObjectMetadata::default())
                .await
                .unwrap();
        }

        let object = store.get("a.jpg").await.unwrap().unwrap();
        assert_eq!(object.data, Bytes::from_static(b"second"));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("images"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
