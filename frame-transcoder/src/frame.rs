//! Frame color handling: decoded frames are brought into packed BGR and then
//! reordered to RGB before they reach the encoder.

use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame::Video;

use crate::scaler::Scaler;

/// Packed layout every decoded frame is normalised to before color conversion.
pub const SOURCE_FORMAT: Pixel = Pixel::BGR24;

const BYTES_PER_PIXEL: usize = 3;

/// Normalises decoded frames of one stream into [`SOURCE_FORMAT`].
pub struct FrameConverter {
    width: u32,
    height: u32,
    scaler: Option<Scaler>,
}

impl FrameConverter {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scaler: None,
        }
    }

    pub fn to_source(&mut self, decoded: &Video) -> anyhow::Result<Video> {
        if decoded.width() != self.width || decoded.height() != self.height {
            anyhow::bail!(
                "frame size {}x{} differs from stream size {}x{}",
                decoded.width(),
                decoded.height(),
                self.width,
                self.height
            );
        }
        if decoded.format() == SOURCE_FORMAT {
            return Ok(decoded.clone());
        }

        let rebuild = match &self.scaler {
            Some(scaler) => scaler.input_format() != decoded.format(),
            None => true,
        };
        if rebuild {
            self.scaler = Some(Scaler::new(
                decoded.format(),
                SOURCE_FORMAT,
                self.width,
                self.height,
            )?);
        }

        let mut converted = Video::empty();
        if let Some(scaler) = self.scaler.as_mut() {
            scaler.run(decoded, &mut converted)?;
        }
        converted.set_pts(decoded.pts());
        Ok(converted)
    }
}

/// Swaps the first and third channel of every pixel in place, turning packed
/// BGR into RGB. Row padding beyond `width * 3` is left untouched.
pub fn swap_red_blue(frame: &mut Video) -> anyhow::Result<()> {
    if frame.format() != Pixel::BGR24 && frame.format() != Pixel::RGB24 {
        anyhow::bail!("cannot swap channels of {:?} frame", frame.format());
    }

    let width = frame.width() as usize;
    let height = frame.height() as usize;
    if width == 0 || height == 0 {
        anyhow::bail!("empty frame {}x{}", width, height);
    }

    let stride = frame.stride(0);
    let row_bytes = width * BYTES_PER_PIXEL;
    if stride < row_bytes {
        anyhow::bail!("stride {} shorter than row of {} bytes", stride, row_bytes);
    }

    let data = frame.data_mut(0);
    let needed = stride * (height - 1) + row_bytes;
    if data.len() < needed {
        anyhow::bail!("plane holds {} bytes, {} needed", data.len(), needed);
    }

    for row in data.chunks_mut(stride).take(height) {
        for pixel in row[..row_bytes].chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.swap(0, 2);
        }
    }
    Ok(())
}
