use async_trait::async_trait;
use std::error::Error;

/// Public image host. Best-effort; callers decide about retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostingPort: Send + Sync {
    /// Upload an image and return its public URL.
    async fn upload(
        &self,
        image: Vec<u8>,
        filename: String,
    ) -> Result<String, Box<dyn Error + Send + Sync>>;
}
