//! Archive indirection: raw bytes go to a write-once channel, only a small
//! reference lands in the metadata store.

use crate::domain::submission::SubmittedVideo;
use crate::domain::thumbnails::ArchiveReference;
use crate::ports::archive::{ArchiveChannel, ArchiveRepository};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// The channel rejected or never acknowledged the push
    Channel(String),
    /// Bytes were pushed but the reference could not be recorded
    Record(String),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::Channel(e) => write!(f, "Archive push failed: {}", e),
            ArchiveError::Record(e) => write!(f, "Archive reference not recorded: {}", e),
        }
    }
}

impl std::error::Error for ArchiveError {}

#[derive(Clone)]
pub struct ArchiveService {
    channel: Arc<dyn ArchiveChannel>,
    repo: Arc<dyn ArchiveRepository>,
}

impl ArchiveService {
    pub fn new(channel: Arc<dyn ArchiveChannel>, repo: Arc<dyn ArchiveRepository>) -> Self {
        Self { channel, repo }
    }

    /// Pushes the submission's bytes to the archive channel and records the
    /// reference. Any failure is fatal for the submission; a push whose
    /// reference cannot be recorded is withdrawn from the channel.
    pub async fn archive(&self, video: &SubmittedVideo) -> Result<ArchiveReference, ArchiveError> {
        let caption = format!(
            "{}\nsubmitter: {}\nfingerprint: {}\nsize: {} bytes",
            video.filename, video.submitter, video.fingerprint, video.byte_size
        );

        let receipt = self
            .channel
            .push(video.payload.clone(), &video.filename, &caption)
            .await
            .map_err(|e| ArchiveError::Channel(e.to_string()))?;

        let reference = ArchiveReference {
            id: Uuid::new_v4(),
            channel_message_id: receipt.message_id,
            archive_file_id: receipt.file_id,
            source_fingerprint: video.fingerprint.clone(),
            submitter: video.submitter,
            filename: video.filename.clone(),
            byte_size: video.byte_size,
            created_at: Utc::now(),
        };

        if let Err(e) = self.repo.record(&reference).await {
            let message_id = reference.channel_message_id;
            match self.channel.delete_message(message_id).await {
                Ok(()) => warn!(message_id, error = %e, "reference not recorded, archived message withdrawn"),
                Err(delete_err) => warn!(
                    message_id,
                    error = %e,
                    delete_error = %delete_err,
                    "archived message left without a reference"
                ),
            }
            return Err(ArchiveError::Record(e.to_string()));
        }

        info!(
            fingerprint = %reference.source_fingerprint,
            message_id = reference.channel_message_id,
            "submission archived"
        );
        Ok(reference)
    }

    /// Deletes archive references older than `max_age` along with their
    /// channel messages. Best-effort per item; returns how many references
    /// were removed.
    pub async fn purge_expired(&self, max_age: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let expired = match self.repo.created_before(cutoff).await {
            Ok(expired) => expired,
            Err(e) => {
                warn!(error = %e, "retention scan failed");
                return 0;
            }
        };

        let mut removed = 0;
        for reference in expired {
            if let Err(e) = self.channel.delete_message(reference.channel_message_id).await {
                // The reference goes anyway; the message may already be gone.
                warn!(
                    message_id = reference.channel_message_id,
                    error = %e,
                    "failed to delete archived message"
                );
            }
            match self.repo.delete(reference.id).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(id = %reference.id, error = %e, "failed to delete archive reference"),
            }
        }

        if removed > 0 {
            info!(removed, "expired archive references purged");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryArchiveRepository;
    use crate::domain::submission::SourceKind;
    use crate::ports::archive::{ChannelReceipt, MockArchiveChannel};
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::{DateTime, Duration};
    use std::error::Error;

    fn video() -> SubmittedVideo {
        SubmittedVideo {
            fingerprint: "unique-1".to_string(),
            byte_size: 4,
            filename: "clip.mp4".to_string(),
            submitter: 42,
            source_kind: SourceKind::Video,
            payload: Bytes::from_static(b"abcd"),
        }
    }

    fn aged(id_seed: i64, days: i64) -> ArchiveReference {
        ArchiveReference {
            id: Uuid::new_v4(),
            channel_message_id: id_seed,
            archive_file_id: format!("archived-{}", id_seed),
            source_fingerprint: "fp".to_string(),
            submitter: 1,
            filename: "clip.mp4".to_string(),
            byte_size: 1,
            created_at: Utc::now() - Duration::days(days),
        }
    }

    #[tokio::test]
    async fn test_archive_records_reference_without_bytes() {
        let mut channel = MockArchiveChannel::new();
        channel
            .expect_push()
            .withf(|payload, filename, caption| {
                payload[..] == b"abcd"[..]
                    && filename.to_string() == "clip.mp4"
                    && caption.contains("unique-1")
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(ChannelReceipt {
                    message_id: 77,
                    file_id: "archived-file".to_string(),
                })
            });
        let repo = MemoryArchiveRepository::new();
        let service = ArchiveService::new(Arc::new(channel), Arc::new(repo.clone()));

        let reference = service.archive(&video()).await.unwrap();

        assert_eq!(reference.channel_message_id, 77);
        assert_eq!(reference.archive_file_id, "archived-file");
        assert_eq!(reference.byte_size, 4);
        assert_eq!(repo.get(reference.id).await, Some(reference));
    }

    #[tokio::test]
    async fn test_channel_failure_is_fatal() {
        let mut channel = MockArchiveChannel::new();
        channel
            .expect_push()
            .returning(|_, _, _| Err("channel unavailable".into()));
        let repo = MemoryArchiveRepository::new();
        let service = ArchiveService::new(Arc::new(channel), Arc::new(repo.clone()));

        let result = service.archive(&video()).await;

        assert_eq!(
            result,
            Err(ArchiveError::Channel("channel unavailable".to_string()))
        );
        assert_eq!(repo.len().await, 0);
    }

    /// Repository whose writes always fail.
    struct ReadOnlyRepository;

    #[async_trait]
    impl ArchiveRepository for ReadOnlyRepository {
        async fn record(&self, _reference: &ArchiveReference) -> Result<(), Box<dyn Error + Send + Sync>> {
            Err("store unavailable".into())
        }

        async fn created_before(
            &self,
            _cutoff: DateTime<Utc>,
        ) -> Result<Vec<ArchiveReference>, Box<dyn Error + Send + Sync>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _id: Uuid) -> Result<(), Box<dyn Error + Send + Sync>> {
            Err("store unavailable".into())
        }
    }

    fn pushing_channel() -> MockArchiveChannel {
        let mut channel = MockArchiveChannel::new();
        channel.expect_push().times(1).returning(|_, _, _| {
            Ok(ChannelReceipt {
                message_id: 77,
                file_id: "archived-file".to_string(),
            })
        });
        channel
    }

    #[tokio::test]
    async fn test_record_failure_withdraws_message() {
        let mut channel = pushing_channel();
        channel
            .expect_delete_message()
            .withf(|message_id| *message_id == 77)
            .times(1)
            .returning(|_| Ok(()));
        let service = ArchiveService::new(Arc::new(channel), Arc::new(ReadOnlyRepository));

        let result = service.archive(&video()).await;

        assert_eq!(result, Err(ArchiveError::Record("store unavailable".to_string())));
    }

    #[tokio::test]
    async fn test_record_failure_survives_failed_withdrawal() {
        let mut channel = pushing_channel();
        channel
            .expect_delete_message()
            .times(1)
            .returning(|_| Err("message not found".into()));
        let service = ArchiveService::new(Arc::new(channel), Arc::new(ReadOnlyRepository));

        let result = service.archive(&video()).await;

        assert_eq!(result, Err(ArchiveError::Record("store unavailable".to_string())));
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let repo = MemoryArchiveRepository::new();
        let expired = aged(1, 31);
        let fresh = aged(2, 2);
        repo.record(&expired).await.unwrap();
        repo.record(&fresh).await.unwrap();

        let mut channel = MockArchiveChannel::new();
        channel
            .expect_delete_message()
            .withf(|message_id| *message_id == 1)
            .times(1)
            .returning(|_| Ok(()));
        let service = ArchiveService::new(Arc::new(channel), Arc::new(repo.clone()));

        assert_eq!(service.purge_expired(Duration::days(30)).await, 1);
        assert!(repo.get(expired.id).await.is_none());
        assert!(repo.get(fresh.id).await.is_some());
    }

    #[tokio::test]
    async fn test_purge_continues_past_channel_failures() {
        let repo = MemoryArchiveRepository::new();
        repo.record(&aged(1, 40)).await.unwrap();
        repo.record(&aged(2, 50)).await.unwrap();

        let mut channel = MockArchiveChannel::new();
        channel
            .expect_delete_message()
            .times(2)
            .returning(|message_id| {
                if message_id == 2 {
                    Err("message not found".into())
                } else {
                    Ok(())
                }
            });
        let service = ArchiveService::new(Arc::new(channel), Arc::new(repo.clone()));

        assert_eq!(service.purge_expired(Duration::days(30)).await, 2);
        assert_eq!(repo.len().await, 0);
    }
}
