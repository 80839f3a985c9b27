// src/engine/splitter.rs
//
// Tile splitting: one decoded source, one shared geometry, cols*rows square
// tiles rasterized in batches on the blocking pool.
//
// All-or-nothing: any tile failing to draw or encode fails the whole split.
// Cancellation is checked between batches; a cancelled split publishes
// nothing.

use crate::engine::canvas::{Blob, EncodeOptions, SurfaceFactory};
use crate::engine::common::{format_bytes, EngineResult};
use crate::engine::config::EngineConfig;
use crate::engine::decoder::SourceImage;
use crate::engine::geometry::{compute_grid_geometry, GridGeometry, Rect};
use crate::engine::pool::BatchPolicy;
use crate::engine::tasks::{percent, CancellationToken, Outcome};
use crate::error::GridcutError;
use crate::ops::{tile_file_name, Encoding, ExportFormat, GridSpec};
use image::RgbaImage;
use std::fmt;
use std::time::Instant;

/// One encoded tile of a grid split.
#[derive(Clone, Debug)]
pub struct Tile {
    blob: Blob,
    index: usize,
    post_order: usize,
    edge: u32,
    encoding: Encoding,
}

impl Tile {
    pub fn blob(&self) -> &Blob {
        &self.blob
    }

    /// 0-based row-major position in the grid.
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based upload position; the top-left tile is posted last.
    pub fn post_order(&self) -> usize {
        self.post_order
    }

    /// Width and height of the encoded tile.
    pub fn edge(&self) -> u32 {
        self.edge
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn file_name(&self) -> String {
        tile_file_name(self.post_order, self.encoding)
    }
}

/// The complete result of one split invocation.
#[derive(Clone, Debug)]
pub struct TileSet {
    tiles: Vec<Tile>,
    grid: GridSpec,
    format: ExportFormat,
    geometry: GridGeometry,
}

impl TileSet {
    /// Tiles in linear index order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tiles in ascending post order (the order they should be uploaded).
    pub fn in_post_order(&self) -> Vec<&Tile> {
        let mut ordered: Vec<&Tile> = self.tiles.iter().collect();
        ordered.sort_by_key(|t| t.post_order);
        ordered
    }

    pub fn get(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn total_bytes(&self) -> u64 {
        self.tiles.iter().map(|t| t.blob.len() as u64).sum()
    }

    pub fn summary(&self) -> TileSetSummary {
        TileSetSummary {
            count: self.tiles.len(),
            edge: self.geometry.output_edge(),
            total_bytes: self.total_bytes(),
        }
    }

    pub fn into_tiles(self) -> Vec<Tile> {
        self.tiles
    }
}

/// Human-facing description of a finished split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileSetSummary {
    pub count: usize,
    pub edge: u32,
    pub total_bytes: u64,
}

impl fmt::Display for TileSetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tiles, {}x{}px, {} total",
            self.count,
            self.edge,
            self.edge,
            format_bytes(self.total_bytes)
        )
    }
}

/// Execution knobs for a split.
#[derive(Clone, Copy, Debug)]
pub struct SplitOptions {
    pub factory: SurfaceFactory,
    pub policy: BatchPolicy,
    pub optimize_png: bool,
}

impl SplitOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            factory: SurfaceFactory::from_capabilities(config.capabilities),
            policy: BatchPolicy::for_capabilities(config.capabilities),
            optimize_png: config.optimize_png,
        }
    }
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Rasterize and encode the tile at linear `index`. Blocking.
///
/// Each call owns a fresh surface; nothing is shared between tiles.
pub fn render_tile(
    source: &RgbaImage,
    geometry: &GridGeometry,
    grid: GridSpec,
    index: usize,
    format: ExportFormat,
    factory: SurfaceFactory,
    optimize_png: bool,
) -> EngineResult<Tile> {
    let (row, col) = grid.position(index);
    let edge = geometry.output_edge();
    let mut surface = factory.create(edge as f64, edge as f64)?;

    surface.draw_image(
        source,
        geometry.tile_source_rect(row, col),
        Rect::from_size(edge as f64, edge as f64),
    )?;

    let blob = surface
        .encode(EncodeOptions {
            encoding: format.encoding(),
            quality: format.quality(),
            optimize_png,
        })
        .ok_or_else(|| {
            GridcutError::encode_failed(
                format.encoding().as_str(),
                format!("tile {index} (row {row}, col {col}) produced no data"),
            )
        })?;

    Ok(Tile {
        blob,
        index,
        post_order: grid.post_order(index),
        edge,
        encoding: format.encoding(),
    })
}

/// Split `source` into `grid` tiles encoded per `format`.
///
/// `on_progress` receives the completed percentage after each tile. Returns
/// `Outcome::Cancelled` when `cancel` fires; tiles already rendered are
/// discarded.
pub async fn split_into_grid<F>(
    source: &SourceImage,
    grid: GridSpec,
    format: ExportFormat,
    options: SplitOptions,
    on_progress: F,
    cancel: &CancellationToken,
) -> EngineResult<Outcome<TileSet>>
where
    F: FnMut(u8) + Send,
{
    let geometry = compute_grid_geometry(
        source.width(),
        source.height(),
        grid,
        format.max_dimension(),
    );
    let pixels = source.shared();
    let render = move |index: usize| {
        render_tile(
            &pixels,
            &geometry,
            grid,
            index,
            format,
            options.factory,
            options.optimize_png,
        )
    };

    run_batches(
        grid,
        format,
        geometry,
        options.policy,
        render,
        on_progress,
        cancel,
    )
    .await
}

/// Drive `render` over every linear index in batches.
///
/// The first failing tile fails the whole run; rendered tiles are dropped.
async fn run_batches<R, F>(
    grid: GridSpec,
    format: ExportFormat,
    geometry: GridGeometry,
    policy: BatchPolicy,
    render: R,
    mut on_progress: F,
    cancel: &CancellationToken,
) -> EngineResult<Outcome<TileSet>>
where
    R: Fn(usize) -> EngineResult<Tile> + Clone + Send + 'static,
    F: FnMut(u8) + Send,
{
    let start = Instant::now();
    let total = grid.total();
    let batch_size = policy.effective_batch_size();

    tracing::debug!(
        %grid,
        tiles = total,
        edge = geometry.output_edge(),
        scale = geometry.scale,
        batch_size,
        "split started"
    );

    let mut tiles = Vec::new();
    let mut next = 0;
    while next < total {
        if cancel.is_cancelled() {
            tracing::warn!(%grid, completed = tiles.len(), total, "split cancelled");
            return Ok(Outcome::Cancelled);
        }

        let batch = next..(next + batch_size).min(total);
        next = batch.end;

        let handles: Vec<_> = batch
            .map(|index| {
                let render = render.clone();
                tokio::task::spawn_blocking(move || render(index))
            })
            .collect();

        for handle in handles {
            let tile = handle
                .await
                .map_err(|e| GridcutError::internal_panic(format!("tile task failed: {e}")))?
                .inspect_err(|err| {
                    tracing::warn!(%grid, completed = tiles.len(), total, error = %err, "split failed")
                })?;
            tiles.push(tile);
            if !cancel.is_cancelled() {
                on_progress(percent(tiles.len(), total));
            }
        }

        if next < total {
            policy.pause().await;
        }
    }

    if cancel.is_cancelled() {
        tracing::warn!(%grid, "split cancelled after final batch");
        return Ok(Outcome::Cancelled);
    }

    tiles.sort_by_key(|t| t.index);
    let set = TileSet {
        tiles,
        grid,
        format,
        geometry,
    };
    tracing::info!(
        summary = %set.summary(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "split finished"
    );
    Ok(Outcome::Completed(set))
}
