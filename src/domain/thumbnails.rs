//! Derived thumbnails, archive references and cache entries.

use super::submission::SourceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One encoded still, ready to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFrame {
    pub timestamp_secs: f64,
    pub position_label: String,
    pub jpeg: Vec<u8>,
}

/// One published still.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub timestamp_secs: f64,
    pub position_label: String,
}

/// Durable pointer to the archived original. Never holds the bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveReference {
    pub id: Uuid,
    pub channel_message_id: i64,
    pub archive_file_id: String,
    pub source_fingerprint: String,
    pub submitter: i64,
    pub filename: String,
    pub byte_size: u64,
    pub created_at: DateTime<Utc>,
}

/// Cached result for one fingerprint. Inserted once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub thumbnails: Vec<Thumbnail>,
    /// Composite of all stills; absent when composing or uploading it failed.
    #[serde(default)]
    pub grid_url: Option<String>,
    pub archive_reference_id: Uuid,
    pub archive_message_id: i64,
    pub submitter: i64,
    pub filename: String,
    pub byte_size: u64,
    pub source_kind: SourceKind,
    pub duration_secs: f64,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Human-readable summary delivered alongside the thumbnails.
    pub fn summary(&self, cached: bool) -> String {
        let count = self.thumbnails.len();
        let mut summary = format!(
            "{}\n⏱ {}\n📦 {:.1} MB\n🖼 {} thumbnail{}",
            self.filename,
            duration_clock(self.duration_secs),
            self.byte_size as f64 / (1024.0 * 1024.0),
            count,
            if count == 1 { "" } else { "s" }
        );
        if cached {
            summary.push_str(" (cached)");
        }
        summary
    }
}

/// Label such as `2/5 · 00:03` for the still at `position` (zero based).
pub fn position_label(position: usize, total: usize, timestamp_secs: f64) -> String {
    let whole = timestamp_secs.max(0.0) as u64;
    format!("{}/{} · {:02}:{:02}", position + 1, total, whole / 60, whole % 60)
}

fn duration_clock(secs: f64) -> String {
    let whole = secs.max(0.0) as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}
