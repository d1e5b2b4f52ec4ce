use ffmpeg_next::{Dictionary, Rational, codec::packet::Packet, picture};

use crate::{properties::VideoProperties, scaler::Scaler};

/// Largest time base component the MPEG-4 Part 2 encoder accepts.
const MAX_TIME_BASE_COMPONENT: i32 = u16::MAX as i32;

#[derive(Debug, Clone)]
pub struct Settings {
    pub codec: String,
    pub pixel_format: ffmpeg_next::format::Pixel,
    pub keyframe_interval: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            codec: "mpeg4".to_string(),
            pixel_format: ffmpeg_next::format::Pixel::YUV420P,
            keyframe_interval: 12,
        }
    }
}

pub struct Encoder {
    codec: ffmpeg_next::Codec,
    inner: ffmpeg_next::codec::encoder::Video,
    encoder_time_base: Rational,
    frame_index: i64,
    scaler: Option<Scaler>,
}

impl Encoder {
    pub fn new(
        properties: &VideoProperties,
        settings: &Settings,
        global_header: bool,
    ) -> anyhow::Result<Self> {
        let codec = ffmpeg_next::encoder::find_by_name(&settings.codec)
            .ok_or(anyhow::anyhow!("codec not found: {}", settings.codec))?;

        let mut encoder = ffmpeg_next::codec::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        encoder.set_width(properties.width);
        encoder.set_height(properties.height);
        encoder.set_format(settings.pixel_format);
        encoder.set_frame_rate(Some(properties.frame_rate));
        encoder.set_time_base(time_base_for_rate(properties.frame_rate));
        encoder.set_gop(settings.keyframe_interval);
        if global_header {
            encoder.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder.open_with(Dictionary::new())?;
        log::debug!(
            "encoder opened: {} {}x{} @ {}/{}",
            settings.codec,
            properties.width,
            properties.height,
            properties.frame_rate.numerator(),
            properties.frame_rate.denominator()
        );

        let encoder_time_base: Rational = unsafe { (*encoder.0.as_ptr()).time_base.into() };

        Ok(Self {
            codec,
            inner: encoder,
            encoder_time_base,
            frame_index: 0,
            scaler: None,
        })
    }

    pub fn codec(&self) -> ffmpeg_next::Codec {
        self.codec
    }

    pub fn inner(&self) -> &ffmpeg_next::codec::encoder::Video {
        &self.inner
    }

    pub fn time_base(&self) -> Rational {
        self.encoder_time_base
    }

    /// Scales `frame` into the encoder's pixel format when needed and submits it
    /// with the next sequential timestamp.
    pub fn send_frame(&mut self, frame: &ffmpeg_next::frame::Video) -> anyhow::Result<()> {
        let mut converted = if frame.format() != self.inner.format() {
            if self.scaler.is_none() {
                self.scaler = Some(Scaler::new(
                    frame.format(),
                    self.inner.format(),
                    self.inner.width(),
                    self.inner.height(),
                )?);
            }
            let mut converted = ffmpeg_next::frame::Video::empty();
            if let Some(scaler) = self.scaler.as_mut() {
                scaler.run(frame, &mut converted)?;
            }
            converted
        } else {
            frame.clone()
        };

        converted.set_kind(picture::Type::None);
        converted.set_pts(Some(self.frame_index));
        self.inner.send_frame(&converted)?;
        self.frame_index += 1;
        Ok(())
    }

    pub fn send_eof(&mut self) -> anyhow::Result<()> {
        self.inner.send_eof()?;
        Ok(())
    }

    pub fn receive_packet(&mut self) -> anyhow::Result<Option<Packet>> {
        let mut packet = Packet::empty();
        match self.inner.receive_packet(&mut packet) {
            Ok(()) => {
                if packet.duration() == 0 {
                    packet.set_duration(1);
                }
                Ok(Some(packet))
            }
            Err(ffmpeg_next::Error::Other { errno })
                if errno == ffmpeg_next::util::error::EAGAIN =>
            {
                Ok(None)
            }
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// One tick per frame, approximated when the rate's terms exceed what the
/// encoder accepts.
fn time_base_for_rate(rate: Rational) -> Rational {
    let rate = if rate.numerator() > MAX_TIME_BASE_COMPONENT
        || rate.denominator() > MAX_TIME_BASE_COMPONENT
    {
        Rational::from(unsafe {
            ffmpeg_next::ffi::av_d2q(f64::from(rate), MAX_TIME_BASE_COMPONENT)
        })
    } else {
        rate
    };
    rate.invert()
}
