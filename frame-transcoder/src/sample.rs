//! Synthetic clips and frame counting, for tests and smoke checks that need
//! real media without shipping fixture files.

use std::path::Path;

use ffmpeg_next::{Rational, format::Pixel, frame::Video};

use crate::{
    decoder::Decoder, encoder::Settings, frame::FrameConverter, input::AvInput,
    output::FrameWriter, properties::VideoProperties,
};

/// Writes a `frames`-long clip of moving gradients to `path`. The container is
/// picked from the extension.
pub fn write_sample_clip(
    path: &Path,
    frames: u32,
    frame_rate: Rational,
    width: u32,
    height: u32,
) -> anyhow::Result<()> {
    write_clip(path, frames, frame_rate, width, height, |index| {
        gradient_frame(width, height, index)
    })
}

/// Writes a clip whose every pixel is the packed BGR triple `bgr`.
pub fn write_solid_clip(
    path: &Path,
    frames: u32,
    frame_rate: Rational,
    width: u32,
    height: u32,
    bgr: [u8; 3],
) -> anyhow::Result<()> {
    write_clip(path, frames, frame_rate, width, height, |_| {
        solid_frame(width, height, bgr)
    })
}

fn write_clip(
    path: &Path,
    frames: u32,
    frame_rate: Rational,
    width: u32,
    height: u32,
    mut make_frame: impl FnMut(u32) -> Video,
) -> anyhow::Result<()> {
    let properties = VideoProperties {
        frame_count: i64::from(frames),
        frame_rate,
        width,
        height,
    };
    let mut writer = FrameWriter::create(path, &properties, &Settings::default())?;
    for index in 0..frames {
        writer.write_frame(&make_frame(index))?;
    }
    writer.finish()
}

/// Decodes every frame of the best video stream and returns how many came out.
pub fn count_video_frames(path: &Path) -> anyhow::Result<u64> {
    let mut input = AvInput::open(path)?;
    let stream = input
        .best_video_stream()
        .cloned()
        .ok_or(anyhow::anyhow!("no video stream in {}", path.display()))?;
    let mut decoder = Decoder::new(&stream)?;

    let mut count = 0;
    while let Some((index, packet)) = input.read_packet()? {
        if index != stream.index() {
            continue;
        }
        decoder.send_packet(&packet)?;
        while decoder.receive_frame()?.is_some() {
            count += 1;
        }
    }
    decoder.send_eof()?;
    while decoder.receive_frame()?.is_some() {
        count += 1;
    }
    Ok(count)
}

/// Average frame rate the container reports for its best video stream.
pub fn probe_frame_rate(path: &Path) -> anyhow::Result<Rational> {
    let input = AvInput::open(path)?;
    input
        .best_video_stream()
        .map(|s| s.rate())
        .ok_or(anyhow::anyhow!("no video stream in {}", path.display()))
}

/// Mean packed BGR value of the first decoded frame.
pub fn first_frame_mean_bgr(path: &Path) -> anyhow::Result<[f64; 3]> {
    let mut input = AvInput::open(path)?;
    let stream = input
        .best_video_stream()
        .cloned()
        .ok_or(anyhow::anyhow!("no video stream in {}", path.display()))?;
    let mut decoder = Decoder::new(&stream)?;
    let mut converter = FrameConverter::new(decoder.width(), decoder.height());

    let mut first = None;
    while first.is_none() {
        match input.read_packet()? {
            Some((index, packet)) if index == stream.index() => {
                decoder.send_packet(&packet)?;
                first = decoder.receive_frame()?;
            }
            Some(_) => continue,
            None => {
                decoder.send_eof()?;
                first = decoder.receive_frame()?;
                break;
            }
        }
    }
    let first = first.ok_or(anyhow::anyhow!("no frames in {}", path.display()))?;
    let frame = converter.to_source(&first)?;

    let width = frame.width() as usize;
    let stride = frame.stride(0);
    let mut sums = [0f64; 3];
    for row in frame.data(0).chunks(stride).take(frame.height() as usize) {
        for pixel in row[..width * 3].chunks_exact(3) {
            for (sum, value) in sums.iter_mut().zip(pixel) {
                *sum += f64::from(*value);
            }
        }
    }
    let count = (width * frame.height() as usize) as f64;
    Ok(sums.map(|sum| sum / count))
}

fn solid_frame(width: u32, height: u32, bgr: [u8; 3]) -> Video {
    let mut frame = Video::new(Pixel::BGR24, width, height);
    let stride = frame.stride(0);
    let data = frame.data_mut(0);
    for row in data.chunks_mut(stride).take(height as usize) {
        for pixel in row[..width as usize * 3].chunks_exact_mut(3) {
            pixel.copy_from_slice(&bgr);
        }
    }
    frame
}

fn gradient_frame(width: u32, height: u32, index: u32) -> Video {
    let mut frame = Video::new(Pixel::BGR24, width, height);
    let stride = frame.stride(0);
    let data = frame.data_mut(0);
    for (y, row) in data.chunks_mut(stride).take(height as usize).enumerate() {
        for (x, pixel) in row[..width as usize * 3].chunks_exact_mut(3).enumerate() {
            pixel[0] = (x as u32 + index * 8) as u8;
            pixel[1] = (y as u32 * 4) as u8;
            pixel[2] = (index * 16) as u8;
        }
    }
    frame
}
