// src/engine/resizer.rs
//
// Resize engine: one surface of exactly the target size, background fill,
// a single cover/contain/stretch placement, PNG output wrapped in an
// object URL.

use crate::engine::canvas::{Blob, EncodeOptions, SurfaceFactory};
use crate::engine::common::EngineResult;
use crate::engine::config::{EngineConfig, DEFAULT_RESIZE_QUALITY};
use crate::engine::decoder::SourceImage;
use crate::engine::geometry::{fit_rects, preview_dimensions};
use crate::engine::urls::ObjectUrlManager;
use crate::error::GridcutError;
use crate::ops::{resized_file_name, Encoding, FitPolicy, PlatformPreset};
use image::{Rgba, RgbaImage};
use std::time::Instant;

/// Resize output is always PNG.
pub const RESIZE_ENCODING: Encoding = Encoding::Png;

pub const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeRequest {
    pub width: u32,
    pub height: u32,
    pub policy: FitPolicy,
    /// Visible only where `Contain` leaves the frame uncovered.
    pub background: Rgba<u8>,
}

impl ResizeRequest {
    pub fn new(width: u32, height: u32, policy: FitPolicy) -> Self {
        Self {
            width,
            height,
            policy,
            background: DEFAULT_BACKGROUND,
        }
    }

    pub fn for_preset(preset: &PlatformPreset, policy: FitPolicy) -> Self {
        Self::new(preset.width, preset.height, policy)
    }

    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self
    }

    /// Both edges must be at least 1.
    pub fn validate(&self) -> EngineResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GridcutError::invalid_resize_dimensions(
                self.width,
                self.height,
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ResizeSettings {
    pub factory: SurfaceFactory,
    pub quality: f32,
    pub optimize_png: bool,
}

impl ResizeSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            factory: SurfaceFactory::from_capabilities(config.capabilities),
            quality: config.resize_quality,
            optimize_png: config.optimize_png,
        }
    }
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            factory: SurfaceFactory::default(),
            quality: DEFAULT_RESIZE_QUALITY,
            optimize_png: true,
        }
    }
}

/// An encoded resize plus the object URL it is published under.
#[derive(Clone, Debug)]
pub struct ResizeResult {
    pub blob: Blob,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl ResizeResult {
    pub fn file_name(&self) -> String {
        resized_file_name(self.width, self.height, RESIZE_ENCODING)
    }
}

/// Rasterize and encode one resize. Blocking.
pub fn render_resize(
    source: &RgbaImage,
    request: &ResizeRequest,
    settings: &ResizeSettings,
) -> EngineResult<Blob> {
    let mut surface = settings
        .factory
        .create(request.width as f64, request.height as f64)?;
    surface.fill(request.background);

    let placement = fit_rects(
        source.width(),
        source.height(),
        surface.width(),
        surface.height(),
        request.policy,
    );
    surface.draw_image(source, placement.src, placement.dst)?;

    surface
        .encode(EncodeOptions {
            encoding: RESIZE_ENCODING,
            quality: settings.quality,
            optimize_png: settings.optimize_png,
        })
        .ok_or_else(|| {
            GridcutError::encode_failed(
                RESIZE_ENCODING.as_str(),
                format!("{}x{} resize produced no data", request.width, request.height),
            )
        })
}

/// Resize `source` to exactly `request.width x request.height`.
pub async fn resize(
    source: &SourceImage,
    request: ResizeRequest,
    settings: ResizeSettings,
    urls: &ObjectUrlManager,
) -> EngineResult<ResizeResult> {
    request.validate()?;
    let start = Instant::now();
    let pixels = source.shared();

    let blob = tokio::task::spawn_blocking(move || render_resize(&pixels, &request, &settings))
        .await
        .map_err(|e| GridcutError::internal_panic(format!("resize task failed: {e}")))??;

    tracing::info!(
        width = request.width,
        height = request.height,
        policy = request.policy.as_str(),
        bytes = blob.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "resize finished"
    );

    let url = urls.create(blob.clone());
    Ok(ResizeResult {
        blob,
        url,
        width: request.width,
        height: request.height,
    })
}

/// Low-latency preview: the target box is scaled down so its longest edge
/// is at most `max_edge`, then resized through the same pipeline.
pub async fn resize_preview(
    source: &SourceImage,
    request: ResizeRequest,
    max_edge: u32,
    settings: ResizeSettings,
    urls: &ObjectUrlManager,
) -> EngineResult<ResizeResult> {
    request.validate()?;
    let (width, height) = preview_dimensions(request.width, request.height, max_edge);
    let preview = ResizeRequest {
        width,
        height,
        ..request
    };
    // Previews are discarded; skip the expensive recompression pass.
    let settings = ResizeSettings {
        optimize_png: false,
        ..settings
    };
    resize(source, preview, settings, urls).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn decode(blob: &Blob) -> RgbaImage {
        image::load_from_memory(blob.as_slice()).unwrap().into_rgba8()
    }

    fn settings(accelerated: bool) -> ResizeSettings {
        ResizeSettings {
            factory: SurfaceFactory::new(accelerated),
            quality: 0.95,
            optimize_png: false,
        }
    }

    #[test]
    fn cover_paints_whole_frame() {
        let source = RgbaImage::from_pixel(300, 100, RED);
        let request = ResizeRequest::new(50, 50, FitPolicy::Cover).with_background(BLUE);
        for accelerated in [true, false] {
            let out = decode(&render_resize(&source, &request, &settings(accelerated)).unwrap());
            assert_eq!(out.dimensions(), (50, 50));
            assert!(out.pixels().all(|p| *p == RED));
        }
    }

    #[test]
    fn contain_letterboxes_with_background() {
        let source = RgbaImage::from_pixel(200, 100, RED);
        let request = ResizeRequest::new(100, 100, FitPolicy::Contain).with_background(BLUE);
        for accelerated in [true, false] {
            let out = decode(&render_resize(&source, &request, &settings(accelerated)).unwrap());
            assert_eq!(out.get_pixel(50, 10), &BLUE);
            assert_eq!(out.get_pixel(50, 50), &RED);
            assert_eq!(out.get_pixel(50, 90), &BLUE);
        }
    }

    #[test]
    fn stretch_ignores_aspect() {
        let source = RgbaImage::from_pixel(10, 40, RED);
        let request = ResizeRequest::new(80, 20, FitPolicy::Stretch).with_background(BLUE);
        let out = decode(&render_resize(&source, &request, &settings(false)).unwrap());
        assert_eq!(out.dimensions(), (80, 20));
        assert!(out.pixels().all(|p| *p == RED));
    }

    #[test]
    fn zero_dimensions_rejected() {
        let err = ResizeRequest::new(0, 10, FitPolicy::Cover)
            .validate()
            .unwrap_err();
        assert!(matches!(err, GridcutError::InvalidResizeDimensions { .. }));
    }

    #[tokio::test]
    async fn resize_publishes_url() {
        let urls = ObjectUrlManager::new();
        let source = SourceImage::from_rgba(RgbaImage::from_pixel(40, 30, RED)).unwrap();
        let preset = PlatformPreset::get("twitter-post").unwrap();
        let request = ResizeRequest::for_preset(&preset, FitPolicy::Cover);

        let result = resize(&source, request, settings(true), &urls).await.unwrap();
        assert_eq!((result.width, result.height), (1600, 900));
        assert_eq!(result.file_name(), "resized-1600x900.png");
        assert!(urls.is_tracked(&result.url));
        assert_eq!(urls.resolve(&result.url).unwrap(), result.blob);
    }

    #[tokio::test]
    async fn preview_caps_longest_edge() {
        let urls = ObjectUrlManager::new();
        let source = SourceImage::from_rgba(RgbaImage::from_pixel(40, 30, RED)).unwrap();
        let request = ResizeRequest::new(1080, 1920, FitPolicy::Contain);

        let preview = resize_preview(&source, request, 800, settings(true), &urls)
            .await
            .unwrap();
        assert_eq!((preview.width, preview.height), (450, 800));
        assert_eq!(decode(&preview.blob).dimensions(), (450, 800));
    }
}
