// src/engine/canvas.rs
//
// Drawing surfaces: a uniform fill/draw/encode interface over two backends.
//
// - Accelerated: SIMD resampling via fast_image_resize (fractional source crop,
//   alpha-aware Lanczos3), parallel fills via rayon. Preferred when available.
// - Portable: image::imageops crop + resize + overlay. Always available up to
//   the global pixel limit; the fallback.
//
// SurfaceFactory tries the preferred backend and silently falls back when it
// cannot be constructed. A fallback that cannot be constructed is fatal.

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::config::Capabilities;
use crate::engine::encoder;
use crate::engine::geometry::Rect;
use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::GridcutError;
use crate::ops::Encoding;
use fast_image_resize::{self as fir, PixelType, ResizeAlg, ResizeOptions};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use std::sync::Arc;

/// Largest surface area the accelerated backend accepts (4096 x 4096).
pub const ACCELERATED_MAX_PIXELS: u64 = 16_777_216;

/// Encoded image bytes plus their MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    bytes: Arc<[u8]>,
    mime_type: &'static str,
}

impl Blob {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: &'static str) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
            mime_type,
        }
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Accelerated,
    Portable,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EncodeOptions {
    pub encoding: Encoding,
    pub quality: f32,
    pub optimize_png: bool,
}

/// An in-memory raster usable for 2D drawing and binary encoding.
pub trait DrawingSurface: Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn backend(&self) -> BackendKind;

    /// Paint the whole surface with `color`.
    fn fill(&mut self, color: Rgba<u8>);

    /// Draw the `src` region of `source` scaled into `dst`, source-over,
    /// with high-quality smoothing.
    fn draw_image(&mut self, source: &RgbaImage, src: Rect, dst: Rect) -> EngineResult<()>;

    fn pixels(&self) -> &RgbaImage;

    /// Encode the surface. Encoder failure is reported as `None`, not an error.
    fn encode(&self, options: EncodeOptions) -> Option<Blob> {
        match encoder::encode(
            self.pixels(),
            options.encoding,
            options.quality,
            options.optimize_png,
        ) {
            Ok(bytes) if !bytes.is_empty() => Some(Blob::new(bytes, options.encoding.mime_type())),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(backend = ?self.backend(), error = %err, "surface encode failed");
                None
            }
        }
    }
}

/// Normalize a requested surface dimension: non-finite or non-positive
/// values become 1, everything else is rounded to the nearest integer.
pub fn normalize_dimension(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 1;
    }
    value.round().clamp(1.0, u32::MAX as f64) as u32
}

// =============================================================================
// FACTORY
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceFactory {
    prefer_accelerated: bool,
    accelerated_max_pixels: u64,
    portable_max_pixels: u64,
}

impl SurfaceFactory {
    pub fn new(prefer_accelerated: bool) -> Self {
        Self {
            prefer_accelerated,
            accelerated_max_pixels: ACCELERATED_MAX_PIXELS,
            portable_max_pixels: MAX_PIXELS,
        }
    }

    pub fn from_capabilities(capabilities: Capabilities) -> Self {
        Self::new(capabilities.accelerated_surface())
    }

    /// Override the accelerated backend's area limit.
    pub fn with_accelerated_limit(mut self, max_pixels: u64) -> Self {
        self.accelerated_max_pixels = max_pixels;
        self
    }

    /// Lower the portable backend's area limit. Never raises it above
    /// `MAX_PIXELS`.
    pub fn with_portable_limit(mut self, max_pixels: u64) -> Self {
        self.portable_max_pixels = max_pixels.min(MAX_PIXELS);
        self
    }

    pub fn create(&self, width: f64, height: f64) -> EngineResult<Box<dyn DrawingSurface>> {
        let w = normalize_dimension(width);
        let h = normalize_dimension(height);

        if self.prefer_accelerated {
            match AcceleratedSurface::new(w, h, self.accelerated_max_pixels) {
                Ok(surface) => return Ok(Box::new(surface)),
                Err(reason) => {
                    tracing::debug!(width = w, height = h, %reason, "accelerated surface unavailable, falling back");
                }
            }
        }
        Ok(Box::new(PortableSurface::new(w, h, self.portable_max_pixels)?))
    }
}

impl Default for SurfaceFactory {
    fn default() -> Self {
        Self::new(true)
    }
}

// =============================================================================
// ACCELERATED BACKEND
// =============================================================================

pub struct AcceleratedSurface {
    pixels: RgbaImage,
}

impl AcceleratedSurface {
    fn new(width: u32, height: u32, max_pixels: u64) -> std::result::Result<Self, String> {
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(format!("dimension exceeds {MAX_DIMENSION}"));
        }
        let area = width as u64 * height as u64;
        if area > max_pixels {
            return Err(format!("area {area} exceeds accelerated limit {max_pixels}"));
        }
        Ok(Self {
            pixels: RgbaImage::new(width, height),
        })
    }
}

impl DrawingSurface for AcceleratedSurface {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Accelerated
    }

    fn fill(&mut self, color: Rgba<u8>) {
        let buffer: &mut [u8] = &mut self.pixels;
        buffer
            .par_chunks_exact_mut(4)
            .for_each(|px| px.copy_from_slice(&color.0));
    }

    fn draw_image(&mut self, source: &RgbaImage, src: Rect, dst: Rect) -> EngineResult<()> {
        run_with_panic_policy("draw:accelerated", || {
            let Some(src) = clamp_source_rect(src, source) else {
                return Ok(());
            };
            let Some((dx, dy, dw, dh)) = destination_bounds(dst) else {
                return Ok(());
            };

            let scaled = match resample_fir(source, src, dw, dh) {
                Ok(scaled) => scaled,
                Err(reason) => {
                    tracing::debug!(%reason, "fir resample failed, using image crate");
                    resample_portable(source, src, dw, dh)?
                }
            };
            imageops::overlay(&mut self.pixels, &scaled, dx, dy);
            Ok(())
        })
    }

    fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

fn resample_fir(
    source: &RgbaImage,
    src: Rect,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<RgbaImage, String> {
    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| format!("fir source image error: {e:?}"))?;

    let mut dst_image = fir::images::Image::new(dst_width, dst_height, PixelType::U8x4);
    let options = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(fir::FilterType::Lanczos3))
        .crop(src.x, src.y, src.width, src.height);

    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, &options)
        .map_err(|e| format!("fir resize error: {e:?}"))?;

    RgbaImage::from_raw(dst_width, dst_height, dst_image.into_vec())
        .ok_or_else(|| "failed to create rgba image from resized data".to_string())
}

// =============================================================================
// PORTABLE BACKEND
// =============================================================================

pub struct PortableSurface {
    pixels: RgbaImage,
}

impl PortableSurface {
    fn new(width: u32, height: u32, max_pixels: u64) -> EngineResult<Self> {
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(GridcutError::context_unavailable(
                width,
                height,
                format!("dimension exceeds {MAX_DIMENSION}"),
            ));
        }
        if width as u64 * height as u64 > max_pixels {
            return Err(GridcutError::context_unavailable(
                width,
                height,
                format!("area exceeds {max_pixels} pixels"),
            ));
        }
        Ok(Self {
            pixels: RgbaImage::new(width, height),
        })
    }
}

impl DrawingSurface for PortableSurface {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Portable
    }

    fn fill(&mut self, color: Rgba<u8>) {
        for px in self.pixels.pixels_mut() {
            *px = color;
        }
    }

    fn draw_image(&mut self, source: &RgbaImage, src: Rect, dst: Rect) -> EngineResult<()> {
        run_with_panic_policy("draw:portable", || {
            let Some(src) = clamp_source_rect(src, source) else {
                return Ok(());
            };
            let Some((dx, dy, dw, dh)) = destination_bounds(dst) else {
                return Ok(());
            };
            let scaled = resample_portable(source, src, dw, dh)?;
            imageops::overlay(&mut self.pixels, &scaled, dx, dy);
            Ok(())
        })
    }

    fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Crop to whole pixels, then Lanczos3-resample to the destination size.
fn resample_portable(
    source: &RgbaImage,
    src: Rect,
    dst_width: u32,
    dst_height: u32,
) -> EngineResult<RgbaImage> {
    let (w, h) = source.dimensions();
    if w == 0 || h == 0 {
        return Err(GridcutError::draw_failed("source image is empty"));
    }
    // Sub-pixel regions still sample at least one source pixel.
    let x0 = (src.x.round() as u32).min(w - 1);
    let y0 = (src.y.round() as u32).min(h - 1);
    let x1 = (src.right().round() as u32).clamp(x0 + 1, w);
    let y1 = (src.bottom().round() as u32).clamp(y0 + 1, h);

    let cropped = imageops::crop_imm(source, x0, y0, x1 - x0, y1 - y0).to_image();
    if cropped.dimensions() == (dst_width, dst_height) {
        return Ok(cropped);
    }
    Ok(imageops::resize(
        &cropped,
        dst_width,
        dst_height,
        FilterType::Lanczos3,
    ))
}

/// Intersect a source rectangle with the image bounds; `None` when empty.
fn clamp_source_rect(src: Rect, source: &RgbaImage) -> Option<Rect> {
    let w = source.width() as f64;
    let h = source.height() as f64;
    let x0 = src.x.clamp(0.0, w);
    let y0 = src.y.clamp(0.0, h);
    let x1 = src.right().clamp(0.0, w);
    let y1 = src.bottom().clamp(0.0, h);
    let rect = Rect::new(x0, y0, x1 - x0, y1 - y0);
    (rect.width > 0.0 && rect.height > 0.0).then_some(rect)
}

/// Integer placement of a destination rectangle; `None` when it has no area.
///
/// Edges are rounded independently so a centered rectangle stays centered.
fn destination_bounds(dst: Rect) -> Option<(i64, i64, u32, u32)> {
    if !(dst.width > 0.0 && dst.height > 0.0) {
        return None;
    }
    let x0 = dst.x.round();
    let y0 = dst.y.round();
    let dw = normalize_dimension(dst.right().round() - x0);
    let dh = normalize_dimension(dst.bottom().round() - y0);
    Some((x0 as i64, y0 as i64, dw, dh))
}
