use std::path::Path;

use ffmpeg_next::codec::packet::Packet;

use crate::stream::AvStream;

pub struct AvInput {
    inner: ffmpeg_next::format::context::Input,
    streams: Vec<AvStream>,
}

impl AvInput {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let input = ffmpeg_next::format::input(path)
            .map_err(|e| anyhow::anyhow!("open input {}: {}", path.display(), e))?;

        let streams = input.streams().map(AvStream::from).collect();

        Ok(Self {
            inner: input,
            streams,
        })
    }

    /// The stream libav ranks best among the video streams, if any.
    pub fn best_video_stream(&self) -> Option<&AvStream> {
        let best = self.inner.streams().best(ffmpeg_next::media::Type::Video)?;
        let index = best.index();
        self.streams.iter().find(|s| s.index() == index)
    }

    /// Reads the next packet of any stream. `Ok(None)` on end of stream; read
    /// and demux failures are returned rather than retried.
    pub fn read_packet(&mut self) -> anyhow::Result<Option<(usize, Packet)>> {
        loop {
            let mut packet = Packet::empty();
            match packet.read(&mut self.inner) {
                Ok(()) => return Ok(Some((packet.stream(), packet))),
                Err(ffmpeg_next::Error::Eof) => return Ok(None),
                Err(ffmpeg_next::Error::Other { errno })
                    if errno == ffmpeg_next::util::error::EAGAIN =>
                {
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
