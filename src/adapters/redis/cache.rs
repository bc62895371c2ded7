//! Redis ThumbnailCache implementation.

use super::error::StoreError;
use super::pool::RedisPool;
use super::{score, submitter_key, thumbs_key, THUMBS_BY_CREATED};
use crate::domain::thumbnails::CacheEntry;
use crate::ports::cache::{CacheError, ThumbnailCache};
use async_trait::async_trait;
use deadpool_redis::redis::{AsyncCommands, Script};
use std::sync::OnceLock;

/// Writes the entry and both indexes, or nothing when the key is taken.
///
/// KEYS: entry, submitter index, creation index.
/// ARGV: entry JSON, fingerprint, creation score.
const INSERT_ENTRY: &str = r"
if redis.call('SET', KEYS[1], ARGV[1], 'NX') then
    redis.call('ZADD', KEYS[2], ARGV[3], ARGV[2])
    redis.call('ZADD', KEYS[3], ARGV[3], ARGV[2])
    return 1
end
return 0
";

fn insert_script() -> &'static Script {
    static SCRIPT: OnceLock<Script> = OnceLock::new();
    SCRIPT.get_or_init(|| Script::new(INSERT_ENTRY))
}

impl RedisPool {
    async fn load_entry(&self, fingerprint: &str) -> Result<Option<CacheEntry>, StoreError> {
        let mut conn = self.conn().await?;
        let key = thumbs_key(fingerprint);
        let json: Option<String> = conn.get(&key).await?;
        match json {
            Some(data) => serde_json::from_str(&data)
                .map(Some)
                .map_err(|e| StoreError::corrupt(key, e)),
            None => Ok(None),
        }
    }

    /// Returns false when the fingerprint is already taken. The value and its
    /// indexes land in one script call, so a stored entry is always indexed.
    async fn insert_entry(&self, entry: &CacheEntry) -> Result<bool, StoreError> {
        let json = serde_json::to_string(entry).map_err(StoreError::Encode)?;
        let mut conn = self.conn().await?;
        let inserted: i64 = insert_script()
            .key(thumbs_key(&entry.fingerprint))
            .key(submitter_key(entry.submitter))
            .key(THUMBS_BY_CREATED)
            .arg(json)
            .arg(&entry.fingerprint)
            .arg(score(&entry.created_at))
            .invoke_async(&mut conn)
            .await?;
        Ok(inserted == 1)
    }

    async fn submitter_entries(&self, submitter: i64) -> Result<usize, StoreError> {
        let mut conn = self.conn().await?;
        Ok(conn.zcard::<_, usize>(submitter_key(submitter)).await?)
    }
}

#[async_trait]
impl ThumbnailCache for RedisPool {
    async fn lookup(&self, fingerprint: &str) -> Result<Option<CacheEntry>, CacheError> {
        self.load_entry(fingerprint)
            .await
            .map_err(|e| CacheError::Backend(Box::new(e)))
    }

    async fn store(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        match self.insert_entry(entry).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(CacheError::Duplicate(entry.fingerprint.clone())),
            Err(e) => Err(CacheError::Backend(Box::new(e))),
        }
    }

    async fn count_for_submitter(&self, submitter: i64) -> Result<usize, CacheError> {
        self.submitter_entries(submitter)
            .await
            .map_err(|e| CacheError::Backend(Box::new(e)))
    }
}
