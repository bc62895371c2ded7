use crate::application::pipeline::ThumbnailPipeline;
use crate::domain::submission::Attachment;
use crate::ports::cache::ThumbnailCache;
use crate::ports::notifier::Notifier;
use std::sync::Arc;
use tracing::{info, warn};

const USAGE: &str = "🎬 Send me a video (or a video file as a document) and I'll reply \
with up to 5 thumbnails taken from across the clip.\n\n\
Commands:\n/help - show this message\n/stats - how many videos you have processed";

/// Front-end facing service: turns inbound events into pipeline runs and
/// replies.
#[derive(Clone)]
pub struct IntakeService {
    pipeline: Arc<ThumbnailPipeline>,
    cache: Arc<dyn ThumbnailCache>,
    notifier: Arc<dyn Notifier>,
}

impl IntakeService {
    pub fn new(
        pipeline: Arc<ThumbnailPipeline>,
        cache: Arc<dyn ThumbnailCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pipeline,
            cache,
            notifier,
        }
    }

    /// Runs the pipeline for one attachment and delivers the outcome or the
    /// failure notice. Returns the delivered text.
    pub async fn handle(&self, chat_id: i64, submitter: i64, attachment: Attachment) -> String {
        info!(
            submitter,
            fingerprint = %attachment.fingerprint,
            filename = %attachment.filename,
            size = attachment.declared_size,
            "attachment received"
        );

        let text = match self.pipeline.run(submitter, &attachment).await {
            Ok(outcome) => outcome.render(),
            Err(e) => {
                info!(submitter, fingerprint = %attachment.fingerprint, error = %e, "submission not completed");
                e.user_message()
            }
        };

        self.reply(chat_id, &text).await;
        text
    }

    /// Answers `/start`, `/help` and `/stats`. Other text is ignored and
    /// yields `None`.
    pub async fn handle_command(&self, chat_id: i64, submitter: i64, text: &str) -> Option<String> {
        // Group chats address commands as `/stats@botname`.
        let command = text
            .split_whitespace()
            .next()?
            .split('@')
            .next()
            .unwrap_or_default();

        let reply = match command {
            "/start" | "/help" => USAGE.to_string(),
            "/stats" => match self.cache.count_for_submitter(submitter).await {
                Ok(count) => format!("📊 You have processed {} video(s).", count),
                Err(e) => {
                    warn!(submitter, error = %e, "stats lookup failed");
                    "❌ Stats are unavailable right now.".to_string()
                }
            },
            _ => return None,
        };

        self.reply(chat_id, &reply).await;
        Some(reply)
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.notifier.send_text(chat_id, text).await {
            warn!(chat_id, error = %e, "failed to deliver reply");
        }
    }
}
