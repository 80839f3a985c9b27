// src/engine/decoder.rs
//
// Decoder operations: source bytes -> SourceImage (RGBA8), with dimension guards.

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::io::Source;
use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::GridcutError;
use image::{ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;

/// A decoded raster backing all geometry computations.
///
/// Created per operation and dropped once rasterization completes. Cloning
/// shares the pixel buffer.
#[derive(Clone, Debug)]
pub struct SourceImage {
    pixels: Arc<RgbaImage>,
}

impl SourceImage {
    pub fn from_rgba(pixels: RgbaImage) -> EngineResult<Self> {
        check_dimensions(pixels.width(), pixels.height())?;
        Ok(Self {
            pixels: Arc::new(pixels),
        })
    }

    /// Decode encoded bytes (JPEG or PNG).
    pub fn decode(data: &[u8]) -> EngineResult<Self> {
        run_with_panic_policy("decode", || {
            let format = detect_format(data)
                .ok_or_else(|| GridcutError::unsupported_format("unknown"))?;
            if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
                return Err(GridcutError::unsupported_format(format.to_mime_type()));
            }

            // Header-only dimension check before allocating the full raster.
            let (width, height) = ImageReader::with_format(Cursor::new(data), format)
                .into_dimensions()
                .map_err(|e| GridcutError::decode_failed(format!("header: {e}")))?;
            check_dimensions(width, height)?;

            let img = image::load_from_memory_with_format(data, format)
                .map_err(|e| GridcutError::decode_failed(format!("decode failed: {e}")))?;
            Self::from_rgba(img.into_rgba8())
        })
    }

    /// Load and decode from any non-URL source. Blocking.
    pub fn load(source: &Source) -> EngineResult<Self> {
        let bytes = source.load()?;
        Self::decode(&bytes)
    }

    /// Load and decode on the blocking pool.
    pub async fn load_async(source: Source) -> EngineResult<Self> {
        tokio::task::spawn_blocking(move || Self::load(&source))
            .await
            .map_err(|e| GridcutError::internal_panic(format!("decode task failed: {e}")))?
    }

    /// Natural width
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Natural height
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub(crate) fn shared(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.pixels)
    }
}

/// Sniff the container format from magic bytes.
pub fn detect_format(data: &[u8]) -> Option<ImageFormat> {
    image::guess_format(data).ok()
}

/// Reject empty rasters and rasters beyond the security limits.
pub fn check_dimensions(width: u32, height: u32) -> EngineResult<()> {
    if width == 0 || height == 0 {
        return Err(GridcutError::decode_failed(format!(
            "image has empty dimensions {width}x{height}"
        )));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(GridcutError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(GridcutError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decodes_png_to_rgba() {
        let source = SourceImage::decode(&png_bytes(12, 7)).unwrap();
        assert_eq!((source.width(), source.height()), (12, 7));
        assert_eq!(source.pixels().get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn rejects_garbage() {
        let err = SourceImage::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, GridcutError::UnsupportedFormat { .. }));
    }

    #[test]
    fn rejects_truncated_png() {
        let mut bytes = png_bytes(32, 32);
        bytes.truncate(40);
        assert!(SourceImage::decode(&bytes).is_err());
    }

    #[test]
    fn check_dimensions_limits() {
        assert!(check_dimensions(1, 1).is_ok());
        assert!(check_dimensions(0, 10).is_err());
        assert!(matches!(
            check_dimensions(MAX_DIMENSION + 1, 1),
            Err(GridcutError::DimensionExceedsLimit { .. })
        ));
        assert!(matches!(
            check_dimensions(20_000, 20_000),
            Err(GridcutError::PixelCountExceedsLimit { .. })
        ));
    }

    #[tokio::test]
    async fn load_async_reads_memory_source() {
        let source = Source::from_bytes(png_bytes(5, 5));
        let image = SourceImage::load_async(source).await.unwrap();
        assert_eq!(image.width(), 5);
    }
}
