use async_trait::async_trait;
use bytes::Bytes;
use std::error::Error;

/// Downloads attachment bytes from the messaging platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn fetch(&self, file_id: &str) -> Result<Bytes, Box<dyn Error + Send + Sync>>;
}
