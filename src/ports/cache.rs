use crate::domain::thumbnails::CacheEntry;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum CacheError {
    /// An entry for this fingerprint already exists. Not a failure: re-read it.
    Duplicate(String),
    Backend(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Duplicate(fingerprint) => {
                write!(f, "Cache entry already exists for {}", fingerprint)
            }
            CacheError::Backend(e) => write!(f, "Cache backend error: {}", e),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CacheError::Duplicate(_) => None,
            CacheError::Backend(e) => Some(e.as_ref()),
        }
    }
}

/// Thumbnail sets keyed by content fingerprint, at most one per key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThumbnailCache: Send + Sync {
    async fn lookup(&self, fingerprint: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Insert-only. Returns `CacheError::Duplicate` when the key is taken.
    async fn store(&self, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Number of entries created for a submitter.
    async fn count_for_submitter(&self, submitter: i64) -> Result<usize, CacheError>;
}
