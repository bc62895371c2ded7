//! Submission pipeline: admission, cache, archive, decode, publish, store.

use crate::application::archive::{ArchiveError, ArchiveService};
use crate::application::publisher::{PublishError, Publisher};
use crate::domain::admission::AdmissionController;
use crate::domain::av::keyframes::select_timestamps;
use crate::domain::av::thumbnails::compose_grid;
use crate::domain::av::{ProbeError, VideoDecoder, VideoProbe};
use crate::domain::scratch::with_scratch_file;
use crate::domain::submission::{Attachment, Rejection, SubmittedVideo};
use crate::domain::thumbnails::{position_label, CacheEntry, ExtractedFrame};
use crate::ports::cache::{CacheError, ThumbnailCache};
use crate::ports::files::FileSource;
use chrono::Utc;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    AdmissionDenied,
    Unsupported,
    SizeExceeded { size: u64, limit: u64 },
    Download(String),
    Archive(ArchiveError),
    Probe(ProbeError),
    /// No timeline, or every extraction missed
    NoThumbnails,
    AllUploadsFailed { attempted: usize },
    Cache(String),
    Internal(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::AdmissionDenied => write!(f, "Admission denied"),
            PipelineError::Unsupported => write!(f, "Unsupported attachment"),
            PipelineError::SizeExceeded { size, limit } => {
                write!(f, "Attachment of {} bytes exceeds {} bytes", size, limit)
            }
            PipelineError::Download(e) => write!(f, "Download failed: {}", e),
            PipelineError::Archive(e) => write!(f, "{}", e),
            PipelineError::Probe(e) => write!(f, "{}", e),
            PipelineError::NoThumbnails => write!(f, "No thumbnails extracted"),
            PipelineError::AllUploadsFailed { attempted } => {
                write!(f, "All {} thumbnail uploads failed", attempted)
            }
            PipelineError::Cache(e) => write!(f, "Cache error: {}", e),
            PipelineError::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<ArchiveError> for PipelineError {
    fn from(err: ArchiveError) -> Self {
        PipelineError::Archive(err)
    }
}

impl From<ProbeError> for PipelineError {
    fn from(err: ProbeError) -> Self {
        PipelineError::Probe(err)
    }
}

impl From<PublishError> for PipelineError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::AllFailed { attempted } => PipelineError::AllUploadsFailed { attempted },
        }
    }
}

impl From<Rejection> for PipelineError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::UnsupportedType => PipelineError::Unsupported,
            Rejection::TooLarge { size, limit } => PipelineError::SizeExceeded { size, limit },
        }
    }
}

impl PipelineError {
    /// The one notice shown to the submitter.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::AdmissionDenied => {
                "⏳ Too many requests. Please wait a minute and try again.".to_string()
            }
            PipelineError::Unsupported => {
                "❌ Please send a video file (mp4, mkv, mov, avi, webm, ...).".to_string()
            }
            PipelineError::SizeExceeded { size, limit } => format!(
                "❌ File too large ({:.1} MB). Maximum is {:.0} MB.",
                *size as f64 / MIB,
                *limit as f64 / MIB
            ),
            PipelineError::Download(_) => {
                "❌ Could not download the file. Please try again.".to_string()
            }
            PipelineError::Archive(_) => {
                "❌ Could not store the video. Please try again later.".to_string()
            }
            PipelineError::Probe(_) => "❌ Could not read this video.".to_string(),
            PipelineError::NoThumbnails => {
                "❌ No thumbnails could be extracted from this video.".to_string()
            }
            PipelineError::AllUploadsFailed { .. } => {
                "❌ Thumbnail upload failed. Please try again later.".to_string()
            }
            PipelineError::Cache(_) | PipelineError::Internal(_) => {
                "❌ Something went wrong. Please try again later.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub entry: CacheEntry,
    /// Served from the cache without new work
    pub cached: bool,
}

impl PipelineOutcome {
    pub fn summary(&self) -> String {
        self.entry.summary(self.cached)
    }

    /// Summary followed by one `label — url` line per thumbnail, then the
    /// grid when there is one.
    pub fn render(&self) -> String {
        let mut text = self.summary();
        for thumbnail in &self.entry.thumbnails {
            text.push('\n');
            text.push_str(&thumbnail.position_label);
            text.push_str(" — ");
            text.push_str(&thumbnail.url);
        }
        if let Some(grid_url) = &self.entry.grid_url {
            text.push_str("\n🧩 Grid — ");
            text.push_str(grid_url);
        }
        text
    }
}

pub struct ThumbnailPipeline {
    admission: Arc<AdmissionController>,
    cache: Arc<dyn ThumbnailCache>,
    files: Arc<dyn FileSource>,
    archive: ArchiveService,
    decoder: Arc<dyn VideoDecoder>,
    publisher: Publisher,
    max_thumbnails: usize,
    max_upload_bytes: u64,
}

impl ThumbnailPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        admission: Arc<AdmissionController>,
        cache: Arc<dyn ThumbnailCache>,
        files: Arc<dyn FileSource>,
        archive: ArchiveService,
        decoder: Arc<dyn VideoDecoder>,
        publisher: Publisher,
        max_thumbnails: usize,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            admission,
            cache,
            files,
            archive,
            decoder,
            publisher,
            max_thumbnails,
            max_upload_bytes,
        }
    }

    /// Runs one submission end to end.
    ///
    /// A cache hit returns after a single lookup. Otherwise the bytes are
    /// downloaded, archived, decoded inside a scratch file and published; the
    /// payload is released as soon as decoding finishes.
    pub async fn run(
        &self,
        submitter: i64,
        attachment: &Attachment,
    ) -> Result<PipelineOutcome, PipelineError> {
        if !self.admission.admit(submitter).await {
            warn!(submitter, "submission throttled");
            return Err(PipelineError::AdmissionDenied);
        }

        if let Err(rejection) = attachment.validate(self.max_upload_bytes) {
            info!(submitter, filename = %attachment.filename, ?rejection, "attachment rejected");
            return Err(rejection.into());
        }

        let fingerprint = attachment.fingerprint.as_str();
        match self.cache.lookup(fingerprint).await {
            Ok(Some(entry)) => {
                info!(fingerprint, submitter, "serving cached thumbnails");
                return Ok(PipelineOutcome {
                    entry,
                    cached: true,
                });
            }
            Ok(None) => {}
            Err(e) => return Err(PipelineError::Cache(e.to_string())),
        }

        let payload = self
            .files
            .fetch(&attachment.file_id)
            .await
            .map_err(|e| PipelineError::Download(e.to_string()))?;
        if payload.len() as u64 > self.max_upload_bytes {
            return Err(PipelineError::SizeExceeded {
                size: payload.len() as u64,
                limit: self.max_upload_bytes,
            });
        }

        let video = SubmittedVideo::from_attachment(attachment, submitter, payload);
        let reference = self.archive.archive(&video).await?;

        let SubmittedVideo {
            fingerprint,
            byte_size,
            filename,
            source_kind,
            payload,
            ..
        } = video;

        let decoder = Arc::clone(&self.decoder);
        let max_thumbnails = self.max_thumbnails;
        let suffix = attachment.scratch_suffix();
        // The payload moves into the blocking task and is dropped there.
        let (probe, frames, grid) = tokio::task::spawn_blocking(move || {
            with_scratch_file(&payload, &suffix, |path| {
                extract_keyframes(decoder.as_ref(), path, max_thumbnails)
            })
            .map(|extracted| {
                extracted.map(|(probe, frames)| {
                    let grid = grid_image(&frames);
                    (probe, frames, grid)
                })
            })
        })
        .await
        .map_err(|e| PipelineError::Internal(e.to_string()))?
        .map_err(|e| PipelineError::Internal(e.to_string()))??;

        if frames.is_empty() {
            warn!(%fingerprint, duration_secs = probe.duration_secs, "no thumbnails extracted");
            return Err(PipelineError::NoThumbnails);
        }

        let stem = Path::new(&filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("thumb")
            .to_string();
        let grid_upload = async {
            match grid {
                Some(image) => self.publisher.publish_one(image, format!("{}_grid.jpg", stem)).await,
                None => None,
            }
        };
        let (thumbnails, grid_url) = tokio::join!(self.publisher.publish_all(frames, &stem), grid_upload);
        let thumbnails = thumbnails?;

        let entry = CacheEntry {
            fingerprint,
            thumbnails,
            grid_url,
            archive_reference_id: reference.id,
            archive_message_id: reference.channel_message_id,
            submitter,
            filename,
            byte_size,
            source_kind,
            duration_secs: probe.duration_secs,
            created_at: Utc::now(),
        };

        match self.cache.store(&entry).await {
            Ok(()) => {
                info!(
                    fingerprint = %entry.fingerprint,
                    thumbnails = entry.thumbnails.len(),
                    "thumbnails cached"
                );
                Ok(PipelineOutcome {
                    entry,
                    cached: false,
                })
            }
            Err(CacheError::Duplicate(_)) => {
                debug!(fingerprint = %entry.fingerprint, "lost cache race, re-reading");
                match self.cache.lookup(&entry.fingerprint).await {
                    Ok(Some(winner)) => Ok(PipelineOutcome {
                        entry: winner,
                        cached: true,
                    }),
                    Ok(None) => Ok(PipelineOutcome {
                        entry,
                        cached: false,
                    }),
                    Err(e) => Err(PipelineError::Cache(e.to_string())),
                }
            }
            Err(e) => {
                // The thumbnails are published; the submitter still gets them.
                error!(fingerprint = %entry.fingerprint, error = %e, "failed to cache thumbnails");
                Ok(PipelineOutcome {
                    entry,
                    cached: false,
                })
            }
        }
    }
}

/// Composite of the extracted stills. Failure only costs the grid.
fn grid_image(frames: &[ExtractedFrame]) -> Option<Vec<u8>> {
    let stills: Vec<&[u8]> = frames.iter().map(|frame| frame.jpeg.as_slice()).collect();
    match compose_grid(&stills) {
        Ok(grid) => grid,
        Err(e) => {
            warn!(stills = stills.len(), error = %e, "grid composition failed");
            None
        }
    }
}

/// Probes the file and extracts one still per selected timestamp, in order.
/// Misses are skipped.
fn extract_keyframes(
    decoder: &dyn VideoDecoder,
    path: &Path,
    max_thumbnails: usize,
) -> Result<(VideoProbe, Vec<ExtractedFrame>), ProbeError> {
    let probe = decoder.probe(path)?;
    let timestamps = select_timestamps(probe.duration_secs, max_thumbnails);
    debug!(
        duration_secs = probe.duration_secs,
        fps = probe.fps,
        total_frames = probe.total_frames,
        ?timestamps,
        "video probed"
    );

    let total = timestamps.len();
    let frames = timestamps
        .iter()
        .enumerate()
        .filter_map(|(position, &timestamp_secs)| {
            decoder
                .extract(path, &probe, timestamp_secs)
                .map(|jpeg| ExtractedFrame {
                    timestamp_secs,
                    position_label: position_label(position, total, timestamp_secs),
                    jpeg,
                })
        })
        .collect();

    Ok((probe, frames))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemoryArchiveRepository, MemoryCache};
    use crate::domain::av::thumbnails::encode_jpeg;
    use crate::domain::submission::SourceKind;
    use crate::domain::thumbnails::Thumbnail;
    use crate::ports::archive::{ChannelReceipt, MockArchiveChannel};
    use crate::ports::cache::MockThumbnailCache;
    use crate::ports::files::MockFileSource;
    use crate::ports::hosting::MockHostingPort;
    use bytes::Bytes;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    struct StubDecoder {
        probe: Result<VideoProbe, ProbeError>,
        miss_at: Vec<f64>,
        probes: AtomicUsize,
        extracted: Mutex<Vec<f64>>,
    }

    impl StubDecoder {
        fn new(probe: Result<VideoProbe, ProbeError>) -> Self {
            Self {
                probe,
                miss_at: Vec::new(),
                probes: AtomicUsize::new(0),
                extracted: Mutex::new(Vec::new()),
            }
        }

        fn extracted(&self) -> Vec<f64> {
            self.extracted.lock().unwrap().clone()
        }
    }

    impl VideoDecoder for StubDecoder {
        fn probe(&self, path: &Path) -> Result<VideoProbe, ProbeError> {
            assert!(path.exists());
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.probe.clone()
        }

        fn extract(&self, _path: &Path, _probe: &VideoProbe, timestamp_secs: f64) -> Option<Vec<u8>> {
            self.extracted.lock().unwrap().push(timestamp_secs);
            if self.miss_at.contains(&timestamp_secs) {
                None
            } else {
                let shade = (timestamp_secs * 20.0) as u8;
                encode_jpeg(RgbImage::from_pixel(64, 36, Rgb([shade, 80, 160]))).ok()
            }
        }
    }

    fn twelve_seconds() -> VideoProbe {
        VideoProbe {
            duration_secs: 12.0,
            total_frames: 360,
            fps: 30.0,
            width: 1920,
            height: 1080,
        }
    }

    fn attachment() -> Attachment {
        Attachment::new(
            "file-1",
            Some("unique-1".to_string()),
            Some("holiday.mp4".to_string()),
            Some("video/mp4".to_string()),
            4,
            SourceKind::Video,
        )
    }

    fn files(times: usize) -> MockFileSource {
        let mut files = MockFileSource::new();
        files
            .expect_fetch()
            .times(times)
            .returning(|_| Ok(Bytes::from_static(b"\x00\x00\x00\x18ftypmp42")));
        files
    }

    fn channel(times: usize) -> MockArchiveChannel {
        let mut channel = MockArchiveChannel::new();
        channel.expect_push().times(times).returning(|_, _, _| {
            Ok(ChannelReceipt {
                message_id: 900,
                file_id: "archived".to_string(),
            })
        });
        channel
    }

    fn hosting() -> MockHostingPort {
        let mut hosting = MockHostingPort::new();
        hosting
            .expect_upload()
            .returning(|_, filename| Ok(format!("https://files.example/{}", filename)));
        hosting
    }

    struct Harness {
        files: MockFileSource,
        channel: MockArchiveChannel,
        hosting: MockHostingPort,
        cache: Arc<dyn ThumbnailCache>,
        limit: usize,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                files: files(1),
                channel: channel(1),
                hosting: hosting(),
                cache: Arc::new(MemoryCache::new()),
                limit: 15,
            }
        }

        fn build(self, decoder: Arc<StubDecoder>) -> ThumbnailPipeline {
            ThumbnailPipeline::new(
                Arc::new(AdmissionController::new(self.limit, Duration::from_secs(60))),
                self.cache,
                Arc::new(self.files),
                ArchiveService::new(
                    Arc::new(self.channel),
                    Arc::new(MemoryArchiveRepository::new()),
                ),
                decoder,
                Publisher::new(Arc::new(self.hosting), 3, Duration::from_secs(5)),
                5,
                200 * 1024 * 1024,
            )
        }
    }

    #[tokio::test]
    async fn test_twelve_second_video_keeps_duplicate_timestamp() {
        let decoder = Arc::new(StubDecoder::new(Ok(twelve_seconds())));
        let pipeline = Harness::new().build(decoder.clone());

        let outcome = pipeline.run(42, &attachment()).await.unwrap();

        assert!(!outcome.cached);
        assert_eq!(decoder.extracted(), vec![0.0, 3.0, 6.0, 9.0, 9.0]);
        let labels: Vec<&str> = outcome
            .entry
            .thumbnails
            .iter()
            .map(|t| t.position_label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec!["1/5 · 00:00", "2/5 · 00:03", "3/5 · 00:06", "4/5 · 00:09", "5/5 · 00:09"]
        );
        assert_eq!(
            outcome.entry.thumbnails[0].url,
            "https://files.example/holiday_01.jpg"
        );
        assert_eq!(outcome.entry.archive_message_id, 900);
        assert_eq!(outcome.entry.duration_secs, 12.0);
        assert!(outcome.render().contains("4/5 · 00:09 — https://files.example/holiday_04.jpg"));
    }

    #[tokio::test]
    async fn test_grid_published_alongside_stills() {
        let decoder = Arc::new(StubDecoder::new(Ok(twelve_seconds())));
        let pipeline = Harness::new().build(decoder);

        let outcome = pipeline.run(42, &attachment()).await.unwrap();

        assert_eq!(
            outcome.entry.grid_url.as_deref(),
            Some("https://files.example/holiday_grid.jpg")
        );
        assert_eq!(outcome.entry.thumbnails.len(), 5);
        assert!(outcome
            .render()
            .ends_with("🧩 Grid — https://files.example/holiday_grid.jpg"));
    }

    #[tokio::test]
    async fn test_grid_upload_failure_keeps_stills() {
        let decoder = Arc::new(StubDecoder::new(Ok(twelve_seconds())));
        let mut harness = Harness::new();
        let mut hosting = MockHostingPort::new();
        hosting.expect_upload().times(6).returning(|_, filename| {
            if filename.ends_with("_grid.jpg") {
                Err("host refused".into())
            } else {
                Ok(format!("https://files.example/{}", filename))
            }
        });
        harness.hosting = hosting;
        let pipeline = harness.build(decoder);

        let outcome = pipeline.run(42, &attachment()).await.unwrap();

        assert_eq!(outcome.entry.grid_url, None);
        assert_eq!(outcome.entry.thumbnails.len(), 5);
        assert!(!outcome.render().contains("Grid"));
    }

    #[test]
    fn test_grid_image_soft_on_bad_stills() {
        let frames = vec![ExtractedFrame {
            timestamp_secs: 0.0,
            position_label: position_label(0, 1, 0.0),
            jpeg: vec![0xFF, 0xD8, 0x00],
        }];

        assert_eq!(grid_image(&frames), None);
        assert_eq!(grid_image(&[]), None);
    }

    #[tokio::test]
    async fn test_zero_fps_reports_no_thumbnails_without_extraction() {
        let probe = VideoProbe {
            duration_secs: 0.0,
            total_frames: 360,
            fps: 0.0,
            width: 640,
            height: 360,
        };
        let decoder = Arc::new(StubDecoder::new(Ok(probe)));
        let mut harness = Harness::new();
        harness.hosting = MockHostingPort::new();
        let pipeline = harness.build(decoder.clone());

        let result = pipeline.run(42, &attachment()).await;

        assert_eq!(result, Err(PipelineError::NoThumbnails));
        assert!(decoder.extracted().is_empty());
    }

    #[tokio::test]
    async fn test_resubmission_served_from_cache() {
        let decoder = Arc::new(StubDecoder::new(Ok(twelve_seconds())));
        let cache = Arc::new(MemoryCache::new());
        let mut harness = Harness::new();
        harness.cache = cache.clone();
        let pipeline = harness.build(decoder.clone());

        let first = pipeline.run(42, &attachment()).await.unwrap();
        let second = pipeline.run(7, &attachment()).await.unwrap();

        assert!(second.cached);
        assert_eq!(second.entry, first.entry);
        assert!(second.summary().ends_with("(cached)"));
        // Mocks enforce a single fetch and a single archive push.
        assert_eq!(decoder.probes.load(Ordering::SeqCst), 1);
        assert_eq!(decoder.extracted().len(), 5);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_throttled_submission_does_no_work() {
        let decoder = Arc::new(StubDecoder::new(Ok(twelve_seconds())));
        let mut harness = Harness::new();
        harness.limit = 1;
        let pipeline = harness.build(decoder.clone());

        pipeline.run(42, &attachment()).await.unwrap();
        let denied = pipeline.run(42, &attachment()).await;

        assert_eq!(denied, Err(PipelineError::AdmissionDenied));
        assert_eq!(decoder.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsupported_attachment_rejected_before_download() {
        let decoder = Arc::new(StubDecoder::new(Ok(twelve_seconds())));
        let mut harness = Harness::new();
        harness.files = files(0);
        harness.channel = channel(0);
        let pipeline = harness.build(decoder);

        let notes = Attachment::new(
            "file-2",
            None,
            Some("notes.pdf".to_string()),
            Some("application/pdf".to_string()),
            10,
            SourceKind::Document,
        );
        let result = pipeline.run(42, &notes).await;

        assert_eq!(result, Err(PipelineError::Unsupported));
    }

    #[tokio::test]
    async fn test_archive_failure_stops_before_decode() {
        let decoder = Arc::new(StubDecoder::new(Ok(twelve_seconds())));
        let mut harness = Harness::new();
        let mut failing = MockArchiveChannel::new();
        failing
            .expect_push()
            .returning(|_, _, _| Err("channel down".into()));
        harness.channel = failing;
        let pipeline = harness.build(decoder.clone());

        let result = pipeline.run(42, &attachment()).await;

        assert!(matches!(result, Err(PipelineError::Archive(ArchiveError::Channel(_)))));
        assert_eq!(decoder.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_is_fatal() {
        let decoder = Arc::new(StubDecoder::new(Err(ProbeError::NoVideoStream)));
        let pipeline = Harness::new().build(decoder.clone());

        let result = pipeline.run(42, &attachment()).await;

        assert_eq!(result, Err(PipelineError::Probe(ProbeError::NoVideoStream)));
        assert!(decoder.extracted().is_empty());
    }

    #[tokio::test]
    async fn test_extraction_misses_are_skipped() {
        let mut stub = StubDecoder::new(Ok(twelve_seconds()));
        stub.miss_at = vec![3.0];
        let decoder = Arc::new(stub);
        let pipeline = Harness::new().build(decoder.clone());

        let outcome = pipeline.run(42, &attachment()).await.unwrap();

        let timestamps: Vec<f64> = outcome
            .entry
            .thumbnails
            .iter()
            .map(|t| t.timestamp_secs)
            .collect();
        assert_eq!(timestamps, vec![0.0, 6.0, 9.0, 9.0]);
        assert_eq!(outcome.entry.thumbnails[1].position_label, "3/5 · 00:06");
    }

    #[tokio::test]
    async fn test_all_uploads_failing_is_reported() {
        let decoder = Arc::new(StubDecoder::new(Ok(twelve_seconds())));
        let mut harness = Harness::new();
        let mut hosting = MockHostingPort::new();
        hosting
            .expect_upload()
            .returning(|_, _| Err("host down".into()));
        harness.hosting = hosting;
        let pipeline = harness.build(decoder);

        let result = pipeline.run(42, &attachment()).await;

        assert_eq!(result, Err(PipelineError::AllUploadsFailed { attempted: 5 }));
    }

    #[tokio::test]
    async fn test_lost_cache_race_returns_winner() {
        let winner = CacheEntry {
            fingerprint: "unique-1".to_string(),
            thumbnails: vec![Thumbnail {
                url: "https://files.example/winner.jpg".to_string(),
                timestamp_secs: 0.0,
                position_label: "1/1 · 00:00".to_string(),
            }],
            grid_url: None,
            archive_reference_id: Uuid::new_v4(),
            archive_message_id: 1,
            submitter: 7,
            filename: "holiday.mp4".to_string(),
            byte_size: 4,
            source_kind: SourceKind::Video,
            duration_secs: 12.0,
            created_at: Utc::now(),
        };

        let mut cache = MockThumbnailCache::new();
        let stored = winner.clone();
        let mut lookups = 0;
        cache.expect_lookup().times(2).returning(move |_| {
            lookups += 1;
            if lookups == 1 {
                Ok(None)
            } else {
                Ok(Some(stored.clone()))
            }
        });
        cache
            .expect_store()
            .times(1)
            .returning(|entry| Err(CacheError::Duplicate(entry.fingerprint.clone())));

        let decoder = Arc::new(StubDecoder::new(Ok(twelve_seconds())));
        let mut harness = Harness::new();
        harness.cache = Arc::new(cache);
        let pipeline = harness.build(decoder);

        let outcome = pipeline.run(42, &attachment()).await.unwrap();

        assert!(outcome.cached);
        assert_eq!(outcome.entry, winner);
    }

    #[test]
    fn test_user_messages() {
        assert!(PipelineError::AdmissionDenied
            .user_message()
            .contains("Too many requests"));
        let too_large = PipelineError::SizeExceeded {
            size: 300 * 1024 * 1024,
            limit: 200 * 1024 * 1024,
        };
        assert_eq!(
            too_large.user_message(),
            "❌ File too large (300.0 MB). Maximum is 200 MB."
        );
    }
}
