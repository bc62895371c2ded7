use super::TelegramClient;
use crate::ports::notifier::Notifier;
use async_trait::async_trait;
use serde_json::json;
use std::error::Error;

#[derive(Clone)]
pub struct TelegramNotifier {
    client: TelegramClient,
}

impl TelegramNotifier {
    pub fn new(client: TelegramClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let request = self.client.post("sendMessage").json(&json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        }));
        let _sent: serde_json::Value = self.client.call(request).await?;
        Ok(())
    }
}
