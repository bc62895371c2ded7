use crate::domain::thumbnails::ArchiveReference;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::error::Error;
use uuid::Uuid;

/// Where the archive channel put a pushed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelReceipt {
    pub message_id: i64,
    pub file_id: String,
}

/// Append-only sink for raw submission bytes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArchiveChannel: Send + Sync {
    async fn push(
        &self,
        payload: Bytes,
        filename: &str,
        caption: &str,
    ) -> Result<ChannelReceipt, Box<dyn Error + Send + Sync>>;

    /// Used by the retention pass and to roll back an unrecorded push.
    async fn delete_message(&self, message_id: i64) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Queryable store of archive references.
#[async_trait]
pub trait ArchiveRepository: Send + Sync {
    async fn record(&self, reference: &ArchiveReference)
        -> Result<(), Box<dyn Error + Send + Sync>>;

    /// References created strictly before `cutoff`, oldest first.
    async fn created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ArchiveReference>, Box<dyn Error + Send + Sync>>;

    async fn delete(&self, id: Uuid) -> Result<(), Box<dyn Error + Send + Sync>>;
}
