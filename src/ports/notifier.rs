use async_trait::async_trait;
use std::error::Error;

/// Sends plain-text replies back to a chat.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}
