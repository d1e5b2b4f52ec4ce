use std::path::{Path, PathBuf};

use ffmpeg_next::{Rational, codec::packet::Packet};

use crate::{
    encoder::{Encoder, Settings},
    properties::VideoProperties,
};

pub struct AvOutput {
    inner: ffmpeg_next::format::context::Output,
    stream_index: Option<usize>,
    have_written_header: bool,
    have_written_trailer: bool,
}

impl AvOutput {
    /// Creates (or truncates) the container file at `path`; the muxer is picked
    /// from the extension.
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        let output = ffmpeg_next::format::output(path)
            .map_err(|e| anyhow::anyhow!("open output {}: {}", path.display(), e))?;
        Ok(Self {
            inner: output,
            stream_index: None,
            have_written_header: false,
            have_written_trailer: false,
        })
    }

    pub fn needs_global_header(&self) -> bool {
        self.inner
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER)
    }

    pub fn add_stream(&mut self, encoder: &Encoder) -> anyhow::Result<()> {
        let mut writer_stream = self.inner.add_stream(Some(encoder.codec()))?;
        writer_stream.set_parameters(encoder.inner());
        writer_stream.set_time_base(encoder.time_base());
        self.stream_index = Some(writer_stream.index());
        Ok(())
    }

    pub fn write_header(&mut self) -> anyhow::Result<()> {
        if !self.have_written_header {
            self.inner.write_header()?;
            self.have_written_header = true;
        }
        Ok(())
    }

    pub fn write_packet(&mut self, mut packet: Packet, time_base: Rational) -> anyhow::Result<()> {
        self.write_header()?;
        let index = self
            .stream_index
            .ok_or(anyhow::anyhow!("no output stream added"))?;
        let out_time_base = self
            .inner
            .stream(index)
            .ok_or(anyhow::anyhow!("stream not found"))?
            .time_base();

        packet.set_stream(index);
        packet.set_position(-1);
        packet.rescale_ts(time_base, out_time_base);
        packet.write_interleaved(&mut self.inner)?;
        Ok(())
    }

    pub fn finish(&mut self) -> anyhow::Result<()> {
        if self.have_written_header && !self.have_written_trailer {
            self.have_written_trailer = true;
            self.inner.write_trailer()?;
        }
        Ok(())
    }
}

/// Encoder and muxer for one output file. Frames go in, a finished container
/// comes out. The container is finalized on [`FrameWriter::finish`] or, failing
/// that, when the writer is dropped.
pub struct FrameWriter {
    path: PathBuf,
    encoder: Encoder,
    output: AvOutput,
    frames_written: u64,
    finished: bool,
}

impl FrameWriter {
    pub fn create(
        path: &Path,
        properties: &VideoProperties,
        settings: &Settings,
    ) -> anyhow::Result<Self> {
        let mut output = AvOutput::create(path)?;
        let encoder = Encoder::new(properties, settings, output.needs_global_header())?;
        output.add_stream(&encoder)?;
        output.write_header()?;

        Ok(Self {
            path: path.to_path_buf(),
            encoder,
            output,
            frames_written: 0,
            finished: false,
        })
    }

    pub fn write_frame(&mut self, frame: &ffmpeg_next::frame::Video) -> anyhow::Result<()> {
        self.encoder.send_frame(frame)?;
        self.drain()?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flushes the encoder and writes the trailer. Safe to call more than once.
    pub fn finish(&mut self) -> anyhow::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let flushed = self.encoder.send_eof().and_then(|_| self.drain());
        let trailer = self.output.finish();
        flushed.and(trailer)
    }

    fn drain(&mut self) -> anyhow::Result<()> {
        let time_base = self.encoder.time_base();
        while let Some(packet) = self.encoder.receive_packet()? {
            self.output.write_packet(packet, time_base)?;
        }
        Ok(())
    }
}

impl Drop for FrameWriter {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::warn!("finalize {}: {}", self.path.display(), e);
        }
    }
}
