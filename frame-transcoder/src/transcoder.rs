//! Per-file pipeline: demux, decode, convert colors, encode, mux.
//!
//! [`transcode_file`] never returns an error. Every failure is logged and
//! folded into a [`TranscodeOutcome`] so a caller driving many files can keep
//! going no matter what one file does.

use std::path::{Path, PathBuf};

use ffmpeg_next::frame::Video;

use crate::{
    decoder::Decoder,
    encoder::Settings,
    frame::{FrameConverter, swap_red_blue},
    input::AvInput,
    output::FrameWriter,
    properties::VideoProperties,
};

/// Extension of every output artifact.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// One input file bound to the directory its artifact goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTask {
    input: PathBuf,
    output_dir: PathBuf,
}

impl VideoTask {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<output_dir>/<input stem>.mp4`
    pub fn output_path(&self) -> PathBuf {
        let mut name = self
            .input
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(OUTPUT_EXTENSION);
        self.output_dir.join(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// Both ends opened and the stream was read to the end.
    Completed { frames_decoded: u64, frames_written: u64 },
    /// The input could not be opened or holds no decodable video.
    SourceUnavailable,
    /// The output file or its encoder could not be opened.
    DestinationUnavailable,
    /// Something broke after both ends were open. The artifact may be truncated.
    Failed,
}

impl TranscodeOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TranscodeOutcome::Completed { .. })
    }
}

/// Converts one file end to end with the default encoder settings.
pub fn transcode_file(task: &VideoTask) -> TranscodeOutcome {
    transcode_file_with(task, &Settings::default())
}

pub fn transcode_file_with(task: &VideoTask, settings: &Settings) -> TranscodeOutcome {
    transcode(task, settings, |properties| {
        let mut converter = FrameConverter::new(properties.width, properties.height);
        move |frame: &Video| convert_colors(&mut converter, frame)
    })
}

/// Normalizes a decoded frame to packed BGR and swaps it to RGB order.
fn convert_colors(converter: &mut FrameConverter, frame: &Video) -> anyhow::Result<Video> {
    let mut converted = converter.to_source(frame)?;
    swap_red_blue(&mut converted)?;
    Ok(converted)
}

fn transcode<C>(
    task: &VideoTask,
    settings: &Settings,
    make_converter: impl FnOnce(&VideoProperties) -> C,
) -> TranscodeOutcome
where
    C: FnMut(&Video) -> anyhow::Result<Video>,
{
    let source = task.input().display().to_string();

    let mut input = match AvInput::open(task.input()) {
        Ok(input) => input,
        Err(e) => {
            log::warn!("cannot open video {}, skipping: {}", source, e);
            return TranscodeOutcome::SourceUnavailable;
        }
    };
    let stream = match input.best_video_stream() {
        Some(stream) => stream.clone(),
        None => {
            log::warn!("no video stream in {}, skipping", source);
            return TranscodeOutcome::SourceUnavailable;
        }
    };
    let mut decoder = match Decoder::new(&stream) {
        Ok(decoder) => decoder,
        Err(e) => {
            log::warn!("cannot decode video {}, skipping: {}", source, e);
            return TranscodeOutcome::SourceUnavailable;
        }
    };

    let properties = VideoProperties::from_stream(&stream, &decoder, &source);
    log::debug!(
        "{}: {}x{} @ {:.3} fps, ~{} frames",
        source,
        properties.width,
        properties.height,
        properties.fps(),
        properties.frame_count
    );

    let output_path = task.output_path();
    let mut writer = match std::fs::create_dir_all(task.output_dir())
        .map_err(anyhow::Error::from)
        .and_then(|_| FrameWriter::create(&output_path, &properties, settings))
    {
        Ok(writer) => writer,
        Err(e) => {
            log::error!("cannot create output video {}: {}", output_path.display(), e);
            return TranscodeOutcome::DestinationUnavailable;
        }
    };

    let mut frames = FrameLoop::new(make_converter(&properties));
    let result = frames.run(&mut input, &mut decoder, &mut writer, &source);
    let finished = writer.finish();

    match result.and(finished) {
        Ok(()) => TranscodeOutcome::Completed {
            frames_decoded: frames.decoded,
            frames_written: writer.frames_written(),
        },
        Err(e) => {
            log::error!(
                "unexpected error while processing {} after {} frames: {:#}",
                source,
                frames.decoded,
                e
            );
            TranscodeOutcome::Failed
        }
    }
}

struct FrameLoop<C> {
    convert: C,
    decoded: u64,
}

impl<C> FrameLoop<C>
where
    C: FnMut(&Video) -> anyhow::Result<Video>,
{
    fn new(convert: C) -> Self {
        Self { convert, decoded: 0 }
    }

    fn run(
        &mut self,
        input: &mut AvInput,
        decoder: &mut Decoder,
        writer: &mut FrameWriter,
        source: &str,
    ) -> anyhow::Result<()> {
        let stream_index = decoder.stream_index();
        while let Some((index, packet)) = input.read_packet()? {
            if index != stream_index {
                continue;
            }
            match decoder.send_packet(&packet) {
                Ok(()) => {}
                Err(e) if is_invalid_data(&e) => {
                    log::warn!("dropping corrupt packet in {}: {}", source, e);
                    continue;
                }
                Err(e) => return Err(e),
            }
            self.drain(decoder, writer, source)?;
        }

        decoder.send_eof()?;
        self.drain(decoder, writer, source)
    }

    fn drain(
        &mut self,
        decoder: &mut Decoder,
        writer: &mut FrameWriter,
        source: &str,
    ) -> anyhow::Result<()> {
        while let Some(decoded) = decoder.receive_frame()? {
            self.decoded += 1;

            match (self.convert)(&decoded) {
                Ok(frame) => writer.write_frame(&frame)?,
                Err(e) => {
                    log::error!(
                        "color conversion failed for frame {} of {}: {}",
                        self.decoded,
                        source,
                        e
                    );
                }
            }
        }
        Ok(())
    }
}

fn is_invalid_data(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ffmpeg_next::Error>(),
        Some(ffmpeg_next::Error::InvalidData)
    )
}

#[cfg(test)]
#[path = "transcoder_test.rs"]
mod transcoder_test;
