//! Audio/Video domain modules.
//!
//! Everything in here is blocking decode work and must run off the async
//! runtime (see `tokio::task::spawn_blocking` in the pipeline).

pub mod av;
pub mod keyframes;
pub mod thumbnails;

use std::fmt;
use std::path::Path;

/// Timeline facts read from a video handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProbe {
    /// `total_frames / fps`, or 0 when the frame rate is unknown
    pub duration_secs: f64,
    pub total_frames: u64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    Unopenable(String),
    NoVideoStream,
    Decoder(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Unopenable(e) => write!(f, "Cannot open video: {}", e),
            ProbeError::NoVideoStream => write!(f, "No video stream found"),
            ProbeError::Decoder(e) => write!(f, "Decoder error: {}", e),
        }
    }
}

impl std::error::Error for ProbeError {}

/// Decode seam used by the pipeline. Each call opens and releases its own
/// handle, so calls for different timestamps never share decoder state.
pub trait VideoDecoder: Send + Sync {
    fn probe(&self, path: &Path) -> Result<VideoProbe, ProbeError>;

    /// Returns an encoded still for `timestamp_secs`, or `None` when the frame
    /// cannot be decoded. A miss is a soft failure.
    fn extract(&self, path: &Path, probe: &VideoProbe, timestamp_secs: f64) -> Option<Vec<u8>>;
}

/// `ffmpeg-next` backed decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegDecoder;

impl VideoDecoder for FfmpegDecoder {
    fn probe(&self, path: &Path) -> Result<VideoProbe, ProbeError> {
        av::probe(path)
    }

    fn extract(&self, path: &Path, probe: &VideoProbe, timestamp_secs: f64) -> Option<Vec<u8>> {
        thumbnails::extract_frame(path, probe, timestamp_secs)
    }
}
