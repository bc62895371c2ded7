//! Fan-out publishing of extracted stills to the hosting endpoint.

use crate::domain::thumbnails::{ExtractedFrame, Thumbnail};
use crate::ports::hosting::HostingPort;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Default number of concurrent uploads.
pub const PUBLISH_WORKERS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    AllFailed { attempted: usize },
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::AllFailed { attempted } => {
                write!(f, "All {} thumbnail uploads failed", attempted)
            }
        }
    }
}

impl std::error::Error for PublishError {}

/// Uploads frames through a bounded worker pool shared by every submission.
#[derive(Clone)]
pub struct Publisher {
    hosting: Arc<dyn HostingPort>,
    workers: Arc<Semaphore>,
    upload_timeout: Duration,
}

impl Publisher {
    pub fn new(hosting: Arc<dyn HostingPort>, workers: usize, upload_timeout: Duration) -> Self {
        Self {
            hosting,
            workers: Arc::new(Semaphore::new(workers.max(1))),
            upload_timeout,
        }
    }

    /// Uploads every frame concurrently and returns the successes in input
    /// order. Individual failures are logged and dropped; only a total
    /// failure is an error. Nothing is retried here.
    pub async fn publish_all(
        &self,
        frames: Vec<ExtractedFrame>,
        name_stem: &str,
    ) -> Result<Vec<Thumbnail>, PublishError> {
        let attempted = frames.len();
        if attempted == 0 {
            return Ok(Vec::new());
        }

        // Handles keep their position; dropping one would not cancel the upload.
        let handles: Vec<_> = frames
            .into_iter()
            .enumerate()
            .map(|(index, frame)| {
                let hosting = Arc::clone(&self.hosting);
                let workers = Arc::clone(&self.workers);
                let upload_timeout = self.upload_timeout;
                let filename = format!("{}_{:02}.jpg", name_stem, index + 1);

                tokio::spawn(async move {
                    let url = upload_bounded(&*hosting, &workers, upload_timeout, frame.jpeg, filename)
                        .await?;

                    Ok::<_, String>(Thumbnail {
                        url,
                        timestamp_secs: frame.timestamp_secs,
                        position_label: frame.position_label,
                    })
                })
            })
            .collect();

        let mut thumbnails = Vec::with_capacity(attempted);
        for (index, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(Ok(thumbnail)) => {
                    debug!(index, url = %thumbnail.url, "thumbnail published");
                    thumbnails.push(thumbnail);
                }
                Ok(Err(e)) => warn!(index, error = %e, "thumbnail upload failed"),
                Err(e) => warn!(index, error = %e, "thumbnail upload task aborted"),
            }
        }

        if thumbnails.is_empty() {
            return Err(PublishError::AllFailed { attempted });
        }
        Ok(thumbnails)
    }

    /// Best-effort upload of a single image through the same worker pool.
    pub async fn publish_one(&self, image: Vec<u8>, filename: String) -> Option<String> {
        match upload_bounded(&*self.hosting, &self.workers, self.upload_timeout, image, filename.clone()).await {
            Ok(url) => {
                debug!(%filename, %url, "image published");
                Some(url)
            }
            Err(e) => {
                warn!(%filename, error = %e, "image upload failed");
                None
            }
        }
    }
}

async fn upload_bounded(
    hosting: &dyn HostingPort,
    workers: &Semaphore,
    upload_timeout: Duration,
    image: Vec<u8>,
    filename: String,
) -> Result<String, String> {
    let _permit = workers.acquire().await.map_err(|e| e.to_string())?;
    tokio::time::timeout(upload_timeout, hosting.upload(image, filename))
        .await
        .map_err(|_| format!("timed out after {:?}", upload_timeout))?
        .map_err(|e| e.to_string())
}
