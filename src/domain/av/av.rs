use super::{ProbeError, VideoProbe};
use ffmpeg_next as ffmpeg;
use std::path::Path;

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Opens `path` and reads duration, frame count, frame rate and dimensions.
/// The demuxer and decoder are dropped before returning.
pub fn probe(path: &Path) -> Result<VideoProbe, ProbeError> {
    ffmpeg::init().map_err(|e| ProbeError::Decoder(e.to_string()))?;

    let ictx = ffmpeg::format::input(&path).map_err(|e| ProbeError::Unopenable(e.to_string()))?;
    let stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or(ProbeError::NoVideoStream)?;

    let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
        .and_then(|context| context.decoder().video())
        .map_err(|e| ProbeError::Decoder(e.to_string()))?;

    let fps = frame_rate(stream.avg_frame_rate()).or_else(|| frame_rate(stream.rate()));
    let fps = fps.unwrap_or(0.0);

    // Many containers leave nb_frames empty; estimate from the stream or
    // container duration instead.
    let total_frames = if stream.frames() > 0 {
        stream.frames() as u64
    } else {
        let stream_secs = if stream.duration() > 0 {
            stream.duration() as f64 * f64::from(stream.time_base())
        } else if ictx.duration() > 0 {
            ictx.duration() as f64 / MICROS_PER_SEC
        } else {
            0.0
        };
        estimate_frames(stream_secs, fps)
    };

    Ok(VideoProbe {
        duration_secs: timeline_secs(total_frames, fps),
        total_frames,
        fps,
        width: decoder.width(),
        height: decoder.height(),
    })
}

fn frame_rate(rate: ffmpeg::Rational) -> Option<f64> {
    if rate.denominator() == 0 {
        return None;
    }
    let fps = f64::from(rate);
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

fn estimate_frames(secs: f64, fps: f64) -> u64 {
    if secs > 0.0 && fps > 0.0 {
        (secs * fps).round() as u64
    } else {
        0
    }
}

/// Zero signals "no usable timeline".
pub(crate) fn timeline_secs(total_frames: u64, fps: f64) -> f64 {
    if fps > 0.0 {
        total_frames as f64 / fps
    } else {
        0.0
    }
}
