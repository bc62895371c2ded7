//! Failures of the Redis metadata store.

use deadpool_redis::CreatePoolError;
use std::fmt;

pub type RedisError = deadpool_redis::redis::RedisError;
pub type PoolError = deadpool_redis::PoolError;

#[derive(Debug)]
pub enum StoreError {
    /// The pool could not be built from the configured URL
    CreatePool(CreatePoolError),
    /// No connection could be checked out
    Pool(PoolError),
    Redis(RedisError),
    /// A record could not be serialised before writing
    Encode(serde_json::Error),
    /// The value stored under `key` is not a record we can read
    Corrupt { key: String, source: serde_json::Error },
}

impl StoreError {
    pub(super) fn corrupt(key: impl Into<String>, source: serde_json::Error) -> Self {
        StoreError::Corrupt {
            key: key.into(),
            source,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::CreatePool(e) => write!(f, "Cannot create Redis pool: {}", e),
            StoreError::Pool(e) => write!(f, "No Redis connection available: {}", e),
            StoreError::Redis(e) => write!(f, "Redis command failed: {}", e),
            StoreError::Encode(e) => write!(f, "Cannot encode record: {}", e),
            StoreError::Corrupt { key, source } => {
                write!(f, "Unreadable record at {}: {}", key, source)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::CreatePool(e) => Some(e),
            StoreError::Pool(e) => Some(e),
            StoreError::Redis(e) => Some(e),
            StoreError::Encode(e) => Some(e),
            StoreError::Corrupt { source, .. } => Some(source),
        }
    }
}

impl From<CreatePoolError> for StoreError {
    fn from(err: CreatePoolError) -> Self {
        StoreError::CreatePool(err)
    }
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self {
        StoreError::Pool(err)
    }
}

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        StoreError::Redis(err)
    }
}
