use ffmpeg_next::Rational;

use crate::{decoder::Decoder, stream::AvStream};

/// Rate used when the source does not report a usable one.
pub const FALLBACK_FRAME_RATE: Rational = Rational(30, 1);

/// Read-only snapshot of an opened video stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProperties {
    /// Container-reported frame count. Advisory only, often 0 or inexact.
    pub frame_count: i64,
    pub frame_rate: Rational,
    pub width: u32,
    pub height: u32,
}

impl VideoProperties {
    /// Snapshots the stream, preferring the decoder's dimensions over the
    /// container's. The returned rate is always strictly positive.
    pub fn from_stream(stream: &AvStream, decoder: &Decoder, source: &str) -> Self {
        let width = if decoder.width() > 0 {
            decoder.width()
        } else {
            stream.width()
        };
        let height = if decoder.height() > 0 {
            decoder.height()
        } else {
            stream.height()
        };

        Self {
            frame_count: stream.frames().max(0),
            frame_rate: frame_rate_or_fallback(stream.rate(), source),
            width,
            height,
        }
    }

    pub fn fps(&self) -> f64 {
        f64::from(self.frame_rate)
    }
}

pub fn is_valid_rate(rate: Rational) -> bool {
    rate.numerator() > 0 && rate.denominator() > 0
}

/// Returns `rate` unchanged when strictly positive, otherwise logs and
/// substitutes [`FALLBACK_FRAME_RATE`].
pub fn frame_rate_or_fallback(rate: Rational, source: &str) -> Rational {
    if is_valid_rate(rate) {
        return rate;
    }
    log::warn!(
        "invalid frame rate {}/{} for {}, using {} fps",
        rate.numerator(),
        rate.denominator(),
        source,
        FALLBACK_FRAME_RATE.numerator()
    );
    FALLBACK_FRAME_RATE
}
