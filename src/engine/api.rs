// src/engine/api.rs
//
// ImageEngine: the session object callers hold.
//
// It owns the "current" artifacts (one tile set, one resize result, one
// preview) and their object URLs. Starting a new split/resize/preview
// releases the previous artifact only after the replacement succeeded, so a
// failed or cancelled run never leaves the caller with nothing to show.

use crate::engine::decoder::SourceImage;
use crate::engine::download::{self, BatchReport, SaveOutcome, SaveTarget, ShareTarget};
use crate::engine::io::Source;
use crate::engine::resizer::{self, ResizeRequest, ResizeResult, ResizeSettings};
use crate::engine::splitter::{self, SplitOptions, TileSet, TileSetSummary};
use crate::engine::tasks::{CancellationToken, DownloadProgress, Outcome};
use crate::engine::urls::ObjectUrlManager;
use crate::engine::EngineConfig;
use crate::error::{GridcutError, Result};
use crate::ops::{tile_file_name, ExportFormat, GridSpec};
use std::sync::Arc;

/// A published tile set and the object URL of each tile, by linear index.
struct PublishedTiles {
    set: TileSet,
    urls: Vec<String>,
}

/// The main entry point.
///
/// Usage:
/// ```no_run
/// # async fn run() -> gridcut::Result<()> {
/// use gridcut::{EngineConfig, ExportPreset, GridSpec, ImageEngine, Source};
/// use gridcut::engine::{CancellationToken, DirectoryTarget};
/// use std::sync::Arc;
///
/// let mut engine = ImageEngine::new(EngineConfig::from_env());
/// let grid: GridSpec = "3x3".parse()?;
/// let cancel = CancellationToken::new();
/// engine
///     .split(
///         Source::Path("photo.jpg".into()),
///         grid,
///         ExportPreset::PngStandard.format(),
///         |pct| println!("{pct}%"),
///         &cancel,
///     )
///     .await?;
/// let report = engine
///     .save_all(Arc::new(DirectoryTarget::new("out")), |_| {}, &cancel)
///     .await?;
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
pub struct ImageEngine {
    config: EngineConfig,
    urls: ObjectUrlManager,
    tiles: Option<PublishedTiles>,
    resized: Option<ResizeResult>,
    preview: Option<ResizeResult>,
}

impl ImageEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_urls(config, ObjectUrlManager::new())
    }

    /// Use a caller-provided URL manager (e.g. one backed by a platform store).
    pub fn with_urls(config: EngineConfig, urls: ObjectUrlManager) -> Self {
        Self {
            config,
            urls,
            tiles: None,
            resized: None,
            preview: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn urls(&self) -> &ObjectUrlManager {
        &self.urls
    }

    /// Decode a source on the blocking pool. Object URLs must have been
    /// issued by this engine.
    pub async fn load(&self, source: Source) -> Result<SourceImage> {
        let source = source.resolve(&self.urls)?;
        SourceImage::load_async(source).await
    }

    // =========================================================================
    // SPLIT
    // =========================================================================

    /// Split `source` into a grid of tiles and make them current.
    ///
    /// On cancellation nothing is published and the previous tile set stays.
    pub async fn split<F>(
        &mut self,
        source: Source,
        grid: GridSpec,
        format: ExportFormat,
        on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<Outcome<TileSetSummary>>
    where
        F: FnMut(u8) + Send,
    {
        let image = self.load(source).await?;
        let options = SplitOptions::from_config(&self.config);
        let set = match splitter::split_into_grid(&image, grid, format, options, on_progress, cancel)
            .await?
        {
            Outcome::Completed(set) => set,
            Outcome::Cancelled => return Ok(Outcome::Cancelled),
        };
        drop(image);

        let summary = set.summary();
        let urls = set
            .tiles()
            .iter()
            .map(|tile| self.urls.create(tile.blob().clone()))
            .collect();
        if let Some(previous) = self.tiles.replace(PublishedTiles { set, urls }) {
            self.release_tiles(previous);
        }
        Ok(Outcome::Completed(summary))
    }

    pub fn tiles(&self) -> Option<&TileSet> {
        self.tiles.as_ref().map(|p| &p.set)
    }

    /// Object URL of the tile at linear `index`.
    pub fn tile_url(&self, index: usize) -> Option<&str> {
        self.tiles
            .as_ref()
            .and_then(|p| p.urls.get(index))
            .map(String::as_str)
    }

    // =========================================================================
    // RESIZE
    // =========================================================================

    /// Full-resolution resize; replaces the current resize result.
    pub async fn resize(&mut self, source: Source, request: ResizeRequest) -> Result<&ResizeResult> {
        request.validate()?;
        let image = self.load(source).await?;
        let settings = ResizeSettings::from_config(&self.config);
        let result = resizer::resize(&image, request, settings, &self.urls).await?;

        if let Some(previous) = self.resized.replace(result) {
            tracing::debug!(url = %previous.url, "resize result superseded");
            self.urls.revoke(&previous.url);
        }
        self.resized
            .as_ref()
            .ok_or_else(|| GridcutError::generic("resize result missing after publish"))
    }

    /// Reduced-size preview; replaces the current preview.
    pub async fn preview(&mut self, source: Source, request: ResizeRequest) -> Result<&ResizeResult> {
        request.validate()?;
        let image = self.load(source).await?;
        let settings = ResizeSettings::from_config(&self.config);
        let result = resizer::resize_preview(
            &image,
            request,
            self.config.preview_max_edge,
            settings,
            &self.urls,
        )
        .await?;

        if let Some(previous) = self.preview.replace(result) {
            self.urls.revoke(&previous.url);
        }
        self.preview
            .as_ref()
            .ok_or_else(|| GridcutError::generic("preview missing after publish"))
    }

    pub fn resized(&self) -> Option<&ResizeResult> {
        self.resized.as_ref()
    }

    pub fn preview_result(&self) -> Option<&ResizeResult> {
        self.preview.as_ref()
    }

    // =========================================================================
    // SAVE
    // =========================================================================

    /// Save every current tile to `target` in post order, spaced by the
    /// configured download delay.
    ///
    /// `on_progress` sees `{0, 0}` when the batch starts, `{current, total}`
    /// after each file, and `{0, 0}` again once the batch is over.
    pub async fn save_all<P>(
        &self,
        target: Arc<dyn SaveTarget>,
        mut on_progress: P,
        cancel: &CancellationToken,
    ) -> Result<BatchReport>
    where
        P: FnMut(DownloadProgress),
    {
        let published = self
            .tiles
            .as_ref()
            .ok_or_else(|| GridcutError::nothing_to_save("no tiles have been generated"))?;

        on_progress(DownloadProgress::default());
        let result = download::save_all(
            published.set.tiles(),
            |tile| tile_file_name(tile.post_order(), tile.encoding()),
            target,
            self.config.download_delay,
            &mut on_progress,
            cancel,
        )
        .await;
        on_progress(DownloadProgress::default());
        result
    }

    /// Save or share one tile by linear index.
    pub fn save_tile(
        &self,
        index: usize,
        target: &dyn SaveTarget,
        share: Option<&dyn ShareTarget>,
    ) -> Result<SaveOutcome> {
        let tile = self
            .tiles()
            .and_then(|set| set.get(index))
            .ok_or_else(|| GridcutError::nothing_to_save(format!("no tile at index {index}")))?;
        download::save_one(
            &tile.file_name(),
            tile.blob(),
            self.config.capabilities,
            target,
            share,
        )
    }

    /// Save or share the current full-resolution resize result.
    pub fn save_resized(
        &self,
        target: &dyn SaveTarget,
        share: Option<&dyn ShareTarget>,
    ) -> Result<SaveOutcome> {
        let result = self
            .resized
            .as_ref()
            .ok_or_else(|| GridcutError::nothing_to_save("no resize result"))?;
        download::save_one(
            &result.file_name(),
            &result.blob,
            self.config.capabilities,
            target,
            share,
        )
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Discard every current artifact and release all URLs.
    pub fn reset(&mut self) {
        self.tiles = None;
        self.resized = None;
        self.preview = None;
        let released = self.urls.revoke_all();
        tracing::debug!(released, "engine reset");
    }

    fn release_tiles(&self, previous: PublishedTiles) {
        tracing::debug!(
            grid = %previous.set.grid(),
            tiles = previous.urls.len(),
            "tile set superseded"
        );
        for url in &previous.urls {
            self.urls.revoke(url);
        }
    }
}

impl Default for ImageEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::download::DirectoryTarget;
    use crate::ops::{Encoding, FitPolicy};
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::time::Duration;

    fn png_source(width: u32, height: u32) -> Source {
        let img = RgbaImage::from_pixel(width, height, Rgba([40, 80, 120, 255]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        Source::from_bytes(buf)
    }

    fn quick_engine() -> ImageEngine {
        let mut config = EngineConfig::default();
        config.download_delay = Duration::ZERO;
        config.optimize_png = false;
        ImageEngine::new(config)
    }

    fn small_png() -> ExportFormat {
        ExportFormat::new(Encoding::Png, 0.9, Some(16)).unwrap()
    }

    #[tokio::test]
    async fn split_publishes_and_supersedes() {
        let mut engine = quick_engine();
        let cancel = CancellationToken::new();
        let grid = GridSpec::new(2, 2).unwrap();

        engine
            .split(png_source(64, 64), grid, small_png(), |_| {}, &cancel)
            .await
            .unwrap();
        let first_urls: Vec<String> = (0..4)
            .map(|i| engine.tile_url(i).unwrap().to_string())
            .collect();
        assert_eq!(engine.urls().len(), 4);

        engine
            .split(png_source(64, 64), grid, small_png(), |_| {}, &cancel)
            .await
            .unwrap();
        assert_eq!(engine.urls().len(), 4);
        assert!(first_urls.iter().all(|u| !engine.urls().is_tracked(u)));
    }

    #[tokio::test]
    async fn failed_split_keeps_previous_tiles() {
        let mut engine = quick_engine();
        let cancel = CancellationToken::new();
        let grid = GridSpec::new(1, 1).unwrap();
        engine
            .split(png_source(8, 8), grid, small_png(), |_| {}, &cancel)
            .await
            .unwrap();

        let err = engine
            .split(Source::from_bytes(vec![0u8; 16]), grid, small_png(), |_| {}, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GridcutError::UnsupportedFormat { .. }));
        assert_eq!(engine.tiles().map(TileSet::len), Some(1));
        assert!(engine.tile_url(0).is_some());
    }

    #[tokio::test]
    async fn resize_supersedes_previous_url() {
        let mut engine = quick_engine();
        let request = ResizeRequest::new(20, 10, FitPolicy::Contain);

        let first = engine.resize(png_source(30, 30), request).await.unwrap().url.clone();
        let second = engine.resize(png_source(30, 30), request).await.unwrap().url.clone();
        assert_ne!(first, second);
        assert!(!engine.urls().is_tracked(&first));
        assert!(engine.urls().is_tracked(&second));
    }

    #[tokio::test]
    async fn resize_rejects_zero_before_decoding() {
        let mut engine = quick_engine();
        let err = engine
            .resize(
                Source::from_bytes(Vec::<u8>::new()),
                ResizeRequest::new(0, 0, FitPolicy::Cover),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GridcutError::InvalidResizeDimensions { .. }));
    }

    #[tokio::test]
    async fn save_all_without_tiles_is_an_error() {
        let engine = quick_engine();
        let dir = tempfile::tempdir().unwrap();
        let err = engine
            .save_all(Arc::new(DirectoryTarget::new(dir.path())), |_| {}, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GridcutError::NothingToSave { .. }));
    }

    #[tokio::test]
    async fn reset_releases_everything() {
        let mut engine = quick_engine();
        let cancel = CancellationToken::new();
        engine
            .split(png_source(32, 32), GridSpec::new(2, 1).unwrap(), small_png(), |_| {}, &cancel)
            .await
            .unwrap();
        engine
            .preview(png_source(32, 32), ResizeRequest::new(100, 50, FitPolicy::Cover))
            .await
            .unwrap();
        assert_eq!(engine.urls().len(), 3);

        engine.reset();
        assert!(engine.urls().is_empty());
        assert!(engine.tiles().is_none());
        assert!(engine.preview_result().is_none());
    }

    #[tokio::test]
    async fn object_url_sources_resolve() {
        let mut engine = quick_engine();
        let resized = engine
            .resize(png_source(10, 10), ResizeRequest::new(8, 8, FitPolicy::Stretch))
            .await
            .unwrap()
            .url
            .clone();
        let image = engine.load(Source::ObjectUrl(resized)).await.unwrap();
        assert_eq!((image.width(), image.height()), (8, 8));
    }
}
