use super::VideoProbe;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageError, ImageFormat, Rgb, RgbImage};
use std::path::Path;
use tracing::{debug, warn};

/// Longer side above which stills are downsampled.
pub const MAX_DIMENSION: u32 = 1280;

/// JPEG quality, tuned for size over fidelity.
pub const JPEG_QUALITY: u8 = 75;

/// Largest cell in the composite grid.
pub const GRID_CELL: (u32, u32) = (400, 300);
const GRID_COLUMNS: u32 = 2;
const GRID_GAP: u32 = 10;

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Decodes the frame nearest `timestamp_secs` and returns it JPEG-encoded.
///
/// Opens its own demuxer and decoder, both released before returning.
/// Failures are logged and reported as `None`.
pub fn extract_frame(path: &Path, probe: &VideoProbe, timestamp_secs: f64) -> Option<Vec<u8>> {
    let image = match decode_frame(path, probe, timestamp_secs) {
        Ok(Some(image)) => image,
        Ok(None) => {
            warn!(timestamp_secs, "no frame decoded at timestamp");
            return None;
        }
        Err(e) => {
            warn!(timestamp_secs, error = %e, "frame decode failed");
            return None;
        }
    };

    match encode_jpeg(image) {
        Ok(jpeg) => {
            debug!(timestamp_secs, size_bytes = jpeg.len(), "frame extracted");
            Some(jpeg)
        }
        Err(e) => {
            warn!(timestamp_secs, error = %e, "frame encode failed");
            None
        }
    }
}

/// Frame index for `timestamp_secs`, clamped to `[0, total_frames - 1]`.
pub fn target_frame_index(fps: f64, timestamp_secs: f64, total_frames: u64) -> u64 {
    let raw = (fps * timestamp_secs).floor();
    if total_frames == 0 || !(raw > 0.0) {
        return 0;
    }
    (raw as u64).min(total_frames - 1)
}

/// Dimensions scaled so the longer side is at most `max`, keeping the aspect
/// ratio.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max {
        return (width, height);
    }
    let scale = max as f64 / longest as f64;
    (
        ((width as f64 * scale).round() as u32).max(1),
        ((height as f64 * scale).round() as u32).max(1),
    )
}

fn decode_frame(
    path: &Path,
    probe: &VideoProbe,
    timestamp_secs: f64,
) -> Result<Option<RgbImage>, ffmpeg::Error> {
    ffmpeg::init()?;

    let mut ictx = ffmpeg::format::input(&path)?;
    let (stream_index, time_base, start_time, parameters) = {
        let stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(ffmpeg::Error::StreamNotFound)?;
        (
            stream.index(),
            stream.time_base(),
            stream.start_time(),
            stream.parameters(),
        )
    };

    let mut decoder = ffmpeg::codec::context::Context::from_parameters(parameters)?
        .decoder()
        .video()?;

    let frame_index = target_frame_index(probe.fps, timestamp_secs, probe.total_frames);
    let target_secs = if probe.fps > 0.0 {
        frame_index as f64 / probe.fps
    } else {
        0.0
    };

    // Seek lands on the keyframe at or before the target; decode forward from there.
    let (seek_ts, target_pts) = seek_targets(target_secs, start_time, time_base);
    ictx.seek(seek_ts, ..seek_ts)?;

    let mut decoded = VideoFrame::empty();
    let mut last = VideoFrame::empty();
    let mut have_last = false;

    for (stream, packet) in ictx.packets() {
        if stream.index() != stream_index {
            continue;
        }
        if let Err(e) = decoder.send_packet(&packet) {
            debug!(error = %e, "skipping undecodable packet");
            continue;
        }
        while decoder.receive_frame(&mut decoded).is_ok() {
            if reached(&decoded, target_pts) {
                return to_rgb(&decoded).map(Some);
            }
            std::mem::swap(&mut last, &mut decoded);
            have_last = true;
        }
    }

    decoder.send_eof()?;
    while decoder.receive_frame(&mut decoded).is_ok() {
        if reached(&decoded, target_pts) {
            return to_rgb(&decoded).map(Some);
        }
        std::mem::swap(&mut last, &mut decoded);
        have_last = true;
    }

    // Target lies past the last decodable frame: fall back to the last one seen.
    if have_last {
        to_rgb(&last).map(Some)
    } else {
        Ok(None)
    }
}

/// Container seek position (microseconds) and stream pts for a timestamp
/// measured from the first frame. Streams such as MPEG-TS start well after
/// zero, so both are offset by the stream's start time.
fn seek_targets(target_secs: f64, start_time: i64, time_base: ffmpeg::Rational) -> (i64, i64) {
    // AV_NOPTS_VALUE: the container did not report a start.
    let origin = if start_time == i64::MIN { 0 } else { start_time };
    let origin_secs = origin as f64 * f64::from(time_base);
    let seek_ts = ((origin_secs + target_secs) * MICROS_PER_SEC) as i64;
    (seek_ts, origin + seconds_to_pts(target_secs, time_base))
}

fn seconds_to_pts(secs: f64, time_base: ffmpeg::Rational) -> i64 {
    let numerator = time_base.numerator().max(1) as f64;
    (secs * time_base.denominator() as f64 / numerator) as i64
}

fn reached(frame: &VideoFrame, target_pts: i64) -> bool {
    frame
        .timestamp()
        .or(frame.pts())
        .map_or(true, |pts| pts >= target_pts)
}

fn to_rgb(frame: &VideoFrame) -> Result<RgbImage, ffmpeg::Error> {
    let mut scaler = ffmpeg::software::scaling::context::Context::get(
        frame.format(),
        frame.width(),
        frame.height(),
        ffmpeg::format::Pixel::RGB24,
        frame.width(),
        frame.height(),
        ffmpeg::software::scaling::flag::Flags::BILINEAR,
    )?;
    let mut rgb_frame = VideoFrame::empty();
    scaler.run(frame, &mut rgb_frame)?;

    let width = rgb_frame.width();
    let height = rgb_frame.height();
    let stride = rgb_frame.stride(0);
    let row_len = width as usize * 3;
    let data = rgb_frame.data(0);

    // Rows are padded to the stride; copy only the visible pixels.
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_len;
        if end > data.len() {
            return Err(ffmpeg::Error::InvalidData);
        }
        pixels.extend_from_slice(&data[start..end]);
    }

    RgbImage::from_raw(width, height, pixels).ok_or(ffmpeg::Error::InvalidData)
}

/// Downsamples oversized stills with Lanczos and encodes them as JPEG.
pub(crate) fn encode_jpeg(image: RgbImage) -> Result<Vec<u8>, ImageError> {
    let (width, height) = fit_within(image.width(), image.height(), MAX_DIMENSION);
    let image = if (width, height) != image.dimensions() {
        imageops::resize(&image, width, height, FilterType::Lanczos3)
    } else {
        image
    };

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY).encode_image(&image)?;
    Ok(buffer)
}

/// Tiles the stills two per row on a black canvas and encodes the result.
///
/// Every still is shrunk to fit [`GRID_CELL`]; the first one fixes the cell
/// size. Returns `None` when there is nothing to tile.
pub fn compose_grid<B: AsRef<[u8]>>(stills: &[B]) -> Result<Option<Vec<u8>>, ImageError> {
    let mut cells = Vec::with_capacity(stills.len());
    for jpeg in stills {
        let image = image::load_from_memory_with_format(jpeg.as_ref(), ImageFormat::Jpeg)?.to_rgb8();
        let (width, height) = shrink_to(image.dimensions(), GRID_CELL);
        cells.push(if (width, height) != image.dimensions() {
            imageops::resize(&image, width, height, FilterType::Lanczos3)
        } else {
            image
        });
    }

    let Some(first) = cells.first() else {
        return Ok(None);
    };
    let (cell_w, cell_h) = first.dimensions();
    let rows = (cells.len() as u32).div_ceil(GRID_COLUMNS);
    let mut canvas = RgbImage::from_pixel(
        cell_w * GRID_COLUMNS + GRID_GAP * (GRID_COLUMNS - 1),
        cell_h * rows + GRID_GAP * (rows - 1),
        Rgb([0, 0, 0]),
    );

    for (i, cell) in cells.iter().enumerate() {
        let i = i as u32;
        let x = (i % GRID_COLUMNS) * (cell_w + GRID_GAP);
        let y = (i / GRID_COLUMNS) * (cell_h + GRID_GAP);
        imageops::overlay(&mut canvas, cell, i64::from(x), i64::from(y));
    }

    encode_jpeg(canvas).map(Some)
}

/// Scales `(width, height)` down to fit inside `bounds`. Never upscales.
fn shrink_to((width, height): (u32, u32), (max_w, max_h): (u32, u32)) -> (u32, u32) {
    if width <= max_w && height <= max_h {
        return (width, height);
    }
    let scale = (max_w as f64 / width as f64).min(max_h as f64 / height as f64);
    (
        ((width as f64 * scale).round() as u32).max(1),
        ((height as f64 * scale).round() as u32).max(1),
    )
}
