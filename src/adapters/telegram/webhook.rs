//! Inbound webhook: Telegram updates in, intake runs spawned.

use crate::application::intake::IntakeService;
use crate::domain::submission::{Attachment, SourceKind};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub video: Option<FileMeta>,
    pub document: Option<FileMeta>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct FileMeta {
    pub file_id: String,
    pub file_unique_id: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

impl Message {
    /// Submitter is the sending user, or the chat for anonymous channel posts.
    pub fn submitter(&self) -> i64 {
        self.from.as_ref().map_or(self.chat.id, |user| user.id)
    }

    /// The video-bearing attachment, if any. Inline videos win over documents.
    pub fn attachment(&self) -> Option<Attachment> {
        let (meta, kind) = match (&self.video, &self.document) {
            (Some(video), _) => (video, SourceKind::Video),
            (None, Some(document)) => (document, SourceKind::Document),
            (None, None) => return None,
        };
        Some(Attachment::new(
            meta.file_id.clone(),
            meta.file_unique_id.clone(),
            meta.file_name.clone(),
            meta.mime_type.clone(),
            meta.file_size.unwrap_or(0),
            kind,
        ))
    }
}

pub fn router(intake: IntakeService) -> Router {
    Router::new()
        .route("/webhook", post(receive_update))
        .route("/health", get(health))
        .with_state(intake)
}

/// Always answers 200 at once; the work runs on its own task.
async fn receive_update(
    State(intake): State<IntakeService>,
    Json(update): Json<Update>,
) -> StatusCode {
    let Some(message) = update.message else {
        debug!(update_id = update.update_id, "ignoring update without message");
        return StatusCode::OK;
    };

    let chat_id = message.chat.id;
    let submitter = message.submitter();

    if let Some(attachment) = message.attachment() {
        tokio::spawn(async move {
            intake.handle(chat_id, submitter, attachment).await;
        });
    } else if let Some(text) = message.text {
        tokio::spawn(async move {
            intake.handle_command(chat_id, submitter, &text).await;
        });
    }

    StatusCode::OK
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
