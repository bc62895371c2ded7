//! Inbound attachments and the submissions derived from them.

use bytes::Bytes;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Default ceiling for a single attachment (200 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 200 * 1024 * 1024;

const DEFAULT_FILENAME: &str = "video.mp4";

/// How the attachment reached us: an inline video or a generic file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Video,
    Document,
}

/// Video-bearing attachment announced by the front-end, before any download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Identifier used to download the file
    pub file_id: String,
    /// Stable identifier of the uploaded binary, used as the cache key
    pub fingerprint: String,
    pub filename: String,
    pub mime_type: Option<String>,
    pub declared_size: u64,
    pub source_kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    UnsupportedType,
    TooLarge { size: u64, limit: u64 },
}

impl Attachment {
    pub fn new(
        file_id: impl Into<String>,
        fingerprint: Option<String>,
        filename: Option<String>,
        mime_type: Option<String>,
        declared_size: u64,
        source_kind: SourceKind,
    ) -> Self {
        let file_id = file_id.into();
        Self {
            fingerprint: fingerprint.unwrap_or_else(|| file_id.clone()),
            file_id,
            filename: filename
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            mime_type,
            declared_size,
            source_kind,
        }
    }

    /// Soft validation run before any download happens.
    pub fn validate(&self, max_bytes: u64) -> Result<(), Rejection> {
        if !self.is_video() {
            return Err(Rejection::UnsupportedType);
        }
        if self.declared_size > max_bytes {
            return Err(Rejection::TooLarge {
                size: self.declared_size,
                limit: max_bytes,
            });
        }
        Ok(())
    }

    pub fn is_video(&self) -> bool {
        let mime_is_video = self
            .mime_type
            .as_deref()
            .map(|mime| mime.trim().to_ascii_lowercase().starts_with("video/"))
            .unwrap_or(false);

        self.source_kind == SourceKind::Video
            || mime_is_video
            || video_extension().is_match(&self.filename)
    }

    /// Suffix for the scratch file so demuxers can sniff the container.
    pub fn scratch_suffix(&self) -> String {
        video_extension()
            .find(&self.filename)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_else(|| ".mp4".to_string())
    }
}

fn video_extension() -> &'static Regex {
    static VIDEO_EXTENSION: OnceLock<Regex> = OnceLock::new();
    VIDEO_EXTENSION.get_or_init(|| {
        Regex::new(r"(?i)\.(mp4|mkv|mov|avi|webm|m4v|3gp|flv|wmv|mpe?g|ts)$")
            .expect("video extension pattern is valid")
    })
}

/// One downloaded submission. The payload is transient and never persisted
/// directly; it is dropped once archival and decoding are done.
#[derive(Debug, Clone)]
pub struct SubmittedVideo {
    pub fingerprint: String,
    pub byte_size: u64,
    pub filename: String,
    pub submitter: i64,
    pub source_kind: SourceKind,
    pub payload: Bytes,
}

impl SubmittedVideo {
    pub fn from_attachment(attachment: &Attachment, submitter: i64, payload: Bytes) -> Self {
        Self {
            fingerprint: attachment.fingerprint.clone(),
            byte_size: payload.len() as u64,
            filename: attachment.filename.clone(),
            submitter,
            source_kind: attachment.source_kind,
            payload,
        }
    }
}
