//! Snapshot storage.
//!
//! The store is a trait so the middleware can run against Redis in
//! production and against an in-memory map in tests and embedded use.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use gantry_cache::CacheStore;

use crate::{DeferResult, JobId, ResponseSnapshot};

/// Write-once, read-many storage for deferred-job snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Store the snapshot for a job.
    async fn put(&self, job_id: JobId, snapshot: &ResponseSnapshot) -> DeferResult<()>;

    /// Fetch the snapshot for a job, if one has been written.
    ///
    /// `None` covers both "still running" and "never existed"; the
    /// lookup contract deliberately does not distinguish them.
    async fn get(&self, job_id: JobId) -> DeferResult<Option<ResponseSnapshot>>;
}

/// Redis-backed snapshot store.
pub struct RedisSnapshotStore {
    store: CacheStore,
}

impl RedisSnapshotStore {
    /// Wrap a connected record store.
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    fn key(job_id: JobId) -> String {
        format!("deferred:{job_id}")
    }
}

#[async_trait]
impl SnapshotStore for RedisSnapshotStore {
    async fn put(&self, job_id: JobId, snapshot: &ResponseSnapshot) -> DeferResult<()> {
        self.store.put_json(&Self::key(job_id), snapshot).await?;
        Ok(())
    }

    async fn get(&self, job_id: JobId) -> DeferResult<Option<ResponseSnapshot>> {
        Ok(self.store.get_json(&Self::key(job_id)).await?)
    }
}

/// In-memory snapshot store for tests and single-process embedding.
#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<HashMap<JobId, ResponseSnapshot>>,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn put(&self, job_id: JobId, snapshot: &ResponseSnapshot) -> DeferResult<()> {
        self.inner.lock().unwrap().insert(job_id, snapshot.clone());
        Ok(())
    }

    async fn get(&self, job_id: JobId) -> DeferResult<Option<ResponseSnapshot>> {
        Ok(self.inner.lock().unwrap().get(&job_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemorySnapshotStore::new();
        let job_id = Uuid::new_v4();
        let snapshot = ResponseSnapshot {
            status: 200,
            headers: vec![],
            body: b"ok".to_vec(),
        };

        assert!(store.get(job_id).await.unwrap().is_none());
        store.put(job_id, &snapshot).await.unwrap();
        assert_eq!(store.get(job_id).await.unwrap(), Some(snapshot));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_redis_key_embeds_job_id() {
        let job_id = Uuid::new_v4();
        assert_eq!(
            RedisSnapshotStore::key(job_id),
            format!("deferred:{job_id}")
        );
    }
}
