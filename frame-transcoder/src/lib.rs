/// Registers FFmpeg components and quiets libav's own logger. Call once at startup
/// before opening any input.
pub fn init() -> anyhow::Result<()> {
    ffmpeg_next::init().map_err(|e| anyhow::anyhow!("ffmpeg_next init: {}", e))?;
    ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);
    Ok(())
}

pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod input;
pub mod output;
pub mod properties;
pub mod sample;
pub mod scaler;
pub mod stream;
pub mod transcoder;

pub use properties::VideoProperties;
pub use transcoder::{TranscodeOutcome, VideoTask, transcode_file};
