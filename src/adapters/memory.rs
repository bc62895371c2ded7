//! In-memory adapters for tests and single-process runs.

use crate::domain::thumbnails::{ArchiveReference, CacheEntry};
use crate::ports::archive::ArchiveRepository;
use crate::ports::cache::{CacheError, ThumbnailCache};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl ThumbnailCache for MemoryCache {
    async fn lookup(&self, fingerprint: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.read().await.get(fingerprint).cloned())
    }

    async fn store(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        match entries.entry(entry.fingerprint.clone()) {
            Entry::Occupied(_) => Err(CacheError::Duplicate(entry.fingerprint.clone())),
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                Ok(())
            }
        }
    }

    async fn count_for_submitter(&self, submitter: i64) -> Result<usize, CacheError> {
        Ok(self
            .entries
            .read()
            .await
            .values()
            .filter(|entry| entry.submitter == submitter)
            .count())
    }
}

#[derive(Clone, Default)]
pub struct MemoryArchiveRepository {
    references: Arc<RwLock<HashMap<Uuid, ArchiveReference>>>,
}

impl MemoryArchiveRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<ArchiveReference> {
        self.references.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.references.read().await.len()
    }
}

#[async_trait]
impl ArchiveRepository for MemoryArchiveRepository {
    async fn record(
        &self,
        reference: &ArchiveReference,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.references
            .write()
            .await
            .insert(reference.id, reference.clone());
        Ok(())
    }

    async fn created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ArchiveReference>, Box<dyn Error + Send + Sync>> {
        let mut expired: Vec<ArchiveReference> = self
            .references
            .read()
            .await
            .values()
            .filter(|reference| reference.created_at < cutoff)
            .cloned()
            .collect();
        expired.sort_by_key(|reference| reference.created_at);
        Ok(expired)
    }

    async fn delete(&self, id: Uuid) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.references.write().await.remove(&id);
        Ok(())
    }
}
