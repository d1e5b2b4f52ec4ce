use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{Context, flag::Flags};

/// Pixel-format converter for frames of a fixed geometry.
pub struct Scaler {
    context: Context,
}

impl Scaler {
    /// Converts between formats without resizing.
    pub fn new(src: Pixel, dst: Pixel, width: u32, height: u32) -> anyhow::Result<Self> {
        let context = Context::get(src, width, height, dst, width, height, Flags::BILINEAR)?;
        Ok(Self { context })
    }

    pub fn run(
        &mut self,
        frame: &ffmpeg_next::frame::Video,
        dst: &mut ffmpeg_next::frame::Video,
    ) -> anyhow::Result<()> {
        self.context.run(frame, dst).map_err(|e| e.into())
    }

    pub fn input_format(&self) -> Pixel {
        self.context.input().format
    }
}
