//! In-memory blob store
//!
//! Keeps objects in a map and counts every access. Failures can be injected
//! per operation, which is how the pipeline tests prove that store errors are
//! never mistaken for cache misses.

use crate::keys::validate_key;
use crate::traits::{BlobStore, ObjectMetadata, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use derivia_core::ImageObject;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

#[derive(Default)]
struct InjectedFailures {
    get: Option<String>,
    put: Option<String>,
}

pub struct MemoryStore {
    bucket: String,
    objects: RwLock<HashMap<String, ImageObject>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
    heads: AtomicUsize,
    failures: Mutex<InjectedFailures>,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            heads: AtomicUsize::new(0),
            failures: Mutex::new(InjectedFailures::default()),
        }
    }

    /// Seed an object without touching the access counters.
    pub fn insert(&self, key: &str, data: impl Into<Bytes>, content_type: Option<&str>) {
        let object = ImageObject {
            key: key.to_string(),
            content_type: content_type.map(String::from),
            cache_control: None,
            last_modified: Some(Utc::now()),
            data: data.into(),
        };
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(key.to_string(), object);
        }
    }

    /// Read an object without touching the access counters.
    pub fn peek(&self, key: &str) -> Option<ImageObject> {
        self.objects.read().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Every get, put and existence check issued so far
    pub fn access_count(&self) -> usize {
        self.get_count() + self.put_count() + self.heads.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.gets.store(0, Ordering::SeqCst);
        self.puts.store(0, Ordering::SeqCst);
        self.heads.store(0, Ordering::SeqCst);
    }

    /// Make every subsequent `get` fail with `message` (`None` clears it).
    pub fn fail_gets(&self, message: Option<&str>) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.get = message.map(String::from);
        }
    }

    /// Make every subsequent `put` fail with `message` (`None` clears it).
    pub fn fail_puts(&self, message: Option<&str>) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.put = message.map(String::from);
        }
    }

    fn injected(&self, pick: impl Fn(&InjectedFailures) -> Option<String>) -> Option<String> {
        self.failures.lock().ok().and_then(|f| pick(&*f))
    }
}

fn poisoned() -> StorageError {
    StorageError::BackendError("memory store lock poisoned".to_string())
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<ImageObject>> {
        validate_key(key)?;
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.injected(|f| f.get.clone()) {
            return Err(StorageError::ReadFailed(message));
        }
        let objects = self.objects.read().map_err(|_| poisoned())?;
        Ok(objects.get(key).cloned())
    }

    async fn put(&self, key: &str, data: Bytes, metadata: ObjectMetadata) -> StorageResult<()> {
        validate_key(key)?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.injected(|f| f.put.clone()) {
            return Err(StorageError::WriteFailed(message));
        }
        let object = ImageObject {
            key: key.to_string(),
            content_type: metadata.content_type,
            cache_control: metadata.cache_control,
            last_modified: Some(Utc::now()),
            data,
        };
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        objects.insert(key.to_string(), object);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        self.heads.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.read().map_err(|_| poisoned())?;
        Ok(objects.contains_key(key))
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_accesses_but_not_seeding() {
        let store = MemoryStore::new("images");
        store.insert("a.jpg", &b"jpeg"[..], Some("image/jpeg"));
        assert_eq!(store.access_count(), 0);

        let object = store.get("a.jpg").await.unwrap().unwrap();
        assert_eq!(object.content_type.as_deref(), Some("image/jpeg"));
        assert!(store.get("b.jpg").await.unwrap().is_none());
        store
            .put("c.jpg", Bytes::from_static(b"x"), ObjectMetadata::default())
            .await
            .unwrap();

        assert_eq!(store.get_count(), 2);
        assert_eq!(store.put_count(), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new("images");
        store.insert("a.jpg", &b"jpeg"[..], None);

        store.fail_gets(Some("boom"));
        assert!(matches!(
            store.get("a.jpg").await,
            Err(StorageError::ReadFailed(ref m)) if m == "boom"
        ));
        store.fail_gets(None);
        assert!(store.get("a.jpg").await.unwrap().is_some());

        store.fail_puts(Some("disk full"));
        let result = store
            .put("b.jpg", Bytes::new(), ObjectMetadata::default())
            .await;
        assert!(matches!(result, Err(StorageError::WriteFailed(_))));
        assert!(store.peek("b.jpg").is_none());
    }
}
