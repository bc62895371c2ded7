use super::{TelegramClient, TelegramError};
use crate::ports::files::FileSource;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use std::error::Error;
use tracing::debug;

#[derive(Clone)]
pub struct TelegramFiles {
    client: TelegramClient,
}

impl TelegramFiles {
    pub fn new(client: TelegramClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    file_path: Option<String>,
}

#[async_trait]
impl FileSource for TelegramFiles {
    async fn fetch(&self, file_id: &str) -> Result<Bytes, Box<dyn Error + Send + Sync>> {
        let request = self
            .client
            .post("getFile")
            .json(&json!({ "file_id": file_id }));
        let remote: RemoteFile = self.client.call(request).await?;
        let file_path = remote
            .file_path
            .ok_or(TelegramError::MissingField("file_path"))?;

        let bytes = self
            .client
            .http
            .get(self.client.file_url(&file_path))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(TelegramError::from)?
            .bytes()
            .await
            .map_err(TelegramError::from)?;

        debug!(file_id, size_bytes = bytes.len(), "attachment downloaded");
        Ok(bytes)
    }
}
