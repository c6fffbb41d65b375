//! JPEG encoder gateway built on the `image` crate.
//!
//! Frames are packed to 8-bit RGB (alpha dropped) and compressed with
//! `JpegEncoder::new_with_quality`.  The `image` JPEG encoder is pure Rust and
//! deterministic: the same pixels at the same quality always produce the same
//! bytes.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, RgbImage};
use screen_relay_core::domain::quality::{MAX_QUALITY, MIN_QUALITY};
use screen_relay_core::RawFrame;

use crate::application::gateways::{EncodeError, FrameEncoder};

/// Stateless JPEG encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegFrameEncoder;

impl JpegFrameEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, frame: &RawFrame, quality: u8) -> Result<Vec<u8>, EncodeError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(EncodeError::EmptyFrame);
        }
        let quality = quality.clamp(MIN_QUALITY, MAX_QUALITY);

        let img: RgbImage = ImageBuffer::from_raw(frame.width(), frame.height(), frame.to_rgb8())
            .ok_or_else(|| EncodeError::Codec("pixel buffer does not match dimensions".into()))?;

        let mut buf = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        img.write_with_encoder(encoder)
            .map_err(|e| EncodeError::Codec(e.to_string()))?;

        Ok(buf.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 64x48 gradient, so quality actually changes the output size.
    fn gradient() -> RawFrame {
        let (w, h) = (64u32, 48u32);
        let pixels = (0..w * h)
            .map(|i| {
                let (x, y) = (i % w, i / w);
                0xFF00_0000 | ((x * 4) << 16) | ((y * 5) << 8) | ((x ^ y) & 0xFF)
            })
            .collect();
        RawFrame::from_pixels(w, h, pixels).unwrap()
    }

    #[test]
    fn test_output_is_a_jpeg() {
        let bytes = JpegFrameEncoder::new().encode(&gradient(), 80).unwrap();

        // SOI marker at the start, EOI marker at the end
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let encoder = JpegFrameEncoder::new();
        let frame = gradient();

        assert_eq!(
            encoder.encode(&frame, 70).unwrap(),
            encoder.encode(&frame, 70).unwrap()
        );
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let encoder = JpegFrameEncoder::new();
        let frame = gradient();

        let high = encoder.encode(&frame, 100).unwrap();
        let low = encoder.encode(&frame, 10).unwrap();

        assert!(low.len() < high.len(), "low {} high {}", low.len(), high.len());
    }

    #[test]
    fn test_out_of_range_quality_is_clamped() {
        let encoder = JpegFrameEncoder::new();
        let frame = gradient();

        assert_eq!(
            encoder.encode(&frame, 0).unwrap(),
            encoder.encode(&frame, 1).unwrap()
        );
    }
}
