//! Redis ArchiveRepository implementation.

use super::error::StoreError;
use super::pool::RedisPool;
use super::{archive_key, score, ARCHIVE_BY_CREATED, ARCHIVE_BY_MESSAGE, ARCHIVE_BY_SOURCE};
use crate::domain::thumbnails::ArchiveReference;
use crate::ports::archive::ArchiveRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_redis::redis::{self, AsyncCommands};
use tracing::warn;
use uuid::Uuid;

/// `ZRANGEBYSCORE` bound selecting scores strictly below `cutoff`.
fn before(cutoff: &DateTime<Utc>) -> String {
    format!("({}", score(cutoff))
}

impl RedisPool {
    async fn load_reference(&self, key: &str) -> Result<Option<ArchiveReference>, StoreError> {
        let mut conn = self.conn().await?;
        let json: Option<String> = conn.get(key).await?;
        match json {
            Some(data) => serde_json::from_str(&data)
                .map(Some)
                .map_err(|e| StoreError::corrupt(key, e)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ArchiveRepository for RedisPool {
    async fn record(
        &self,
        reference: &ArchiveReference,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let json = serde_json::to_string(reference).map_err(StoreError::Encode)?;
        let id = reference.id.to_string();
        let mut conn = self.conn().await?;

        let () = redis::pipe()
            .atomic()
            .set(archive_key(&id), json)
            .ignore()
            .zadd(ARCHIVE_BY_CREATED, &id, score(&reference.created_at))
            .ignore()
            .hset(ARCHIVE_BY_MESSAGE, reference.channel_message_id, &id)
            .ignore()
            .hset(ARCHIVE_BY_SOURCE, &reference.source_fingerprint, &id)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    async fn created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ArchiveReference>, Box<dyn std::error::Error + Send + Sync>> {
        let ids: Vec<String> = {
            let mut conn = self.conn().await?;
            conn.zrangebyscore(ARCHIVE_BY_CREATED, "-inf", before(&cutoff))
                .await
                .map_err(StoreError::from)?
        };

        let mut references = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load_reference(&archive_key(&id)).await? {
                Some(reference) => references.push(reference),
                None => warn!(%id, "archive index points at a missing reference"),
            }
        }
        Ok(references)
    }

    async fn delete(&self, id: Uuid) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let key = archive_key(id);
        let existing = self.load_reference(&key).await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        if let Some(reference) = existing {
            pipe.hdel(ARCHIVE_BY_MESSAGE, reference.channel_message_id)
                .ignore()
                .hdel(ARCHIVE_BY_SOURCE, &reference.source_fingerprint)
                .ignore();
        }
        pipe.zrem(ARCHIVE_BY_CREATED, id.to_string())
            .ignore()
            .del(&key)
            .ignore();

        let mut conn = self.conn().await?;
        let () = pipe.query_async(&mut conn).await.map_err(StoreError::from)?;
        Ok(())
    }
}
