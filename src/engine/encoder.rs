// src/engine/encoder.rs
//
// Encoder operations: JPEG and PNG with a fractional (0.0-1.0) quality knob,
// the same scale a canvas `toBlob` call takes.

use crate::engine::common::run_with_panic_policy;
use crate::error::GridcutError;
use crate::ops::Encoding;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{Rgb, RgbImage, Rgba, RgbaImage};

// Type alias for Result - always use GridcutError to preserve error taxonomy
type EncoderResult<T> = std::result::Result<T, GridcutError>;

/// oxipng preset used for full-quality PNG recompression.
const PNG_OPTIMIZATION_PRESET: u8 = 2;

/// Center of truth for mapping a fractional quality onto codec settings.
#[derive(Debug, Clone, Copy)]
pub struct QualitySettings {
    quality: f32,
}

impl QualitySettings {
    pub fn new(quality: f32) -> Self {
        let quality = if quality.is_finite() {
            quality.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Self { quality }
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// libjpeg-style quality, 1..=100.
    pub fn jpeg_quality(&self) -> u8 {
        ((self.quality * 100.0).round() as u8).clamp(1, 100)
    }

    pub fn png_compression(&self) -> CompressionType {
        if self.quality >= 0.95 {
            CompressionType::Best
        } else {
            CompressionType::Default
        }
    }

    /// Full quality asks for the extra lossless recompression pass.
    pub fn png_optimize(&self) -> bool {
        self.quality >= 1.0
    }
}

/// Encode RGBA pixels in the requested encoding.
pub fn encode(
    img: &RgbaImage,
    encoding: Encoding,
    quality: f32,
    optimize_png: bool,
) -> EncoderResult<Vec<u8>> {
    let settings = QualitySettings::new(quality);
    match encoding {
        Encoding::Jpeg => encode_jpeg(img, settings),
        Encoding::Png => encode_png(img, settings, optimize_png),
    }
}

/// Encode to JPEG. JPEG has no alpha channel, so pixels are composited onto
/// white first.
pub fn encode_jpeg(img: &RgbaImage, settings: QualitySettings) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:jpeg", || {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Err(GridcutError::encode_failed(
                "jpeg",
                "width or height is zero",
            ));
        }

        let rgb = RgbImage::from_fn(w, h, |x, y| flatten_on_white(*img.get_pixel(x, y)));

        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, settings.jpeg_quality());
        encoder
            .encode_image(&rgb)
            .map_err(|e| GridcutError::encode_failed("jpeg", format!("JPEG encode failed: {e}")))?;
        Ok(buf)
    })
}

fn flatten_on_white(p: Rgba<u8>) -> Rgb<u8> {
    let alpha = p[3] as u32;
    let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
    Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
}

/// Encode to PNG, optionally recompressing losslessly with oxipng.
pub fn encode_png(
    img: &RgbaImage,
    settings: QualitySettings,
    optimize: bool,
) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:png", || {
        if img.width() == 0 || img.height() == 0 {
            return Err(GridcutError::encode_failed("png", "width or height is zero"));
        }

        let mut buf = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buf, settings.png_compression(), FilterType::Adaptive);
        img.write_with_encoder(encoder)
            .map_err(|e| GridcutError::encode_failed("png", format!("PNG encode failed: {e}")))?;

        if !(optimize && settings.png_optimize()) {
            return Ok(buf);
        }

        let mut options = oxipng::Options::from_preset(PNG_OPTIMIZATION_PRESET);
        options.strip = oxipng::StripChunks::None;
        match oxipng::optimize_from_memory(&buf, &options) {
            Ok(optimized) if optimized.len() < buf.len() => Ok(optimized),
            Ok(_) => Ok(buf),
            Err(e) => {
                // The unoptimized stream is still a valid PNG.
                tracing::debug!(error = %e, "oxipng optimization skipped");
                Ok(buf)
            }
        }
    })
}
