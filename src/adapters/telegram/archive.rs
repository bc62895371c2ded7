use super::{TelegramClient, TelegramError};
use crate::ports::archive::{ArchiveChannel, ChannelReceipt};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use serde::Deserialize;
use serde_json::json;
use std::error::Error;

/// Private channel that keeps one message per archived submission.
#[derive(Clone)]
pub struct TelegramArchive {
    client: TelegramClient,
    channel_id: i64,
}

impl TelegramArchive {
    pub fn new(client: TelegramClient, channel_id: i64) -> Self {
        Self { client, channel_id }
    }
}

#[derive(Debug, Deserialize)]
struct FileRef {
    file_id: String,
}

/// The subset of a sent message we need. Telegram may file a pushed
/// document as a video or animation depending on its content.
#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
    document: Option<FileRef>,
    video: Option<FileRef>,
    animation: Option<FileRef>,
}

impl SentMessage {
    fn into_receipt(self) -> Result<ChannelReceipt, TelegramError> {
        let file = self
            .document
            .or(self.video)
            .or(self.animation)
            .ok_or(TelegramError::MissingField("document"))?;
        Ok(ChannelReceipt {
            message_id: self.message_id,
            file_id: file.file_id,
        })
    }
}

#[async_trait]
impl ArchiveChannel for TelegramArchive {
    async fn push(
        &self,
        payload: Bytes,
        filename: &str,
        caption: &str,
    ) -> Result<ChannelReceipt, Box<dyn Error + Send + Sync>> {
        let length = payload.len() as u64;
        let document = Part::stream_with_length(Body::from(payload), length)
            .file_name(filename.to_string());
        let form = Form::new()
            .text("chat_id", self.channel_id.to_string())
            .text("caption", caption.to_string())
            .part("document", document);

        let sent: SentMessage = self
            .client
            .call(self.client.post("sendDocument").multipart(form))
            .await?;
        Ok(sent.into_receipt()?)
    }

    async fn delete_message(&self, message_id: i64) -> Result<(), Box<dyn Error + Send + Sync>> {
        let request = self.client.post("deleteMessage").json(&json!({
            "chat_id": self.channel_id,
            "message_id": message_id,
        }));
        let _deleted: bool = self.client.call(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_from_document() {
        let sent: SentMessage = serde_json::from_str(
            r#"{"message_id":321,"chat":{"id":-100},"date":0,
                "document":{"file_id":"BQACAgQ","file_unique_id":"AgAD","file_size":10}}"#,
        )
        .unwrap();
        assert_eq!(
            sent.into_receipt().unwrap(),
            ChannelReceipt {
                message_id: 321,
                file_id: "BQACAgQ".to_string()
            }
        );
    }

    #[test]
    fn test_receipt_from_video() {
        let sent: SentMessage = serde_json::from_str(
            r#"{"message_id":5,"video":{"file_id":"BAACAgQ","duration":12}}"#,
        )
        .unwrap();
        assert_eq!(sent.into_receipt().unwrap().file_id, "BAACAgQ");
    }

    #[test]
    fn test_receipt_without_file() {
        let sent: SentMessage = serde_json::from_str(r#"{"message_id":5,"text":"hi"}"#).unwrap();
        assert!(matches!(
            sent.into_receipt(),
            Err(TelegramError::MissingField("document"))
        ));
    }
}
