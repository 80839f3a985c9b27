// src/engine.rs
//
// The core of gridcut:
// 1. Decodes a source once per operation
// 2. Computes crop/fit geometry as pure math
// 3. Rasterizes on drawing surfaces off the async executor
// 4. Publishes results as object URLs and saves them in post order
//
// This file is a facade over the decomposed modules in engine/

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Larger images are rejected to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA.
pub const MAX_PIXELS: u64 = 100_000_000;

/// Maximum tiles in one grid split (`cols * rows`).
/// Every tile is a separate encode and a separate download.
pub const MAX_TILES: u64 = 10_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod api;
mod canvas;
mod common;
mod config;
mod decoder;
mod download;
mod encoder;
mod geometry;
mod io;
mod pool;
mod resizer;
mod splitter;
mod tasks;
mod urls;

pub use api::ImageEngine;
pub use canvas::{
    normalize_dimension, BackendKind, Blob, DrawingSurface, EncodeOptions, SurfaceFactory,
    ACCELERATED_MAX_PIXELS,
};
pub use common::{format_bytes, EngineResult};
pub use config::{
    Capabilities, EngineConfig, DEFAULT_DOWNLOAD_DELAY, DEFAULT_PREVIEW_MAX_EDGE,
    DEFAULT_RESIZE_QUALITY,
};
pub use decoder::{check_dimensions, detect_format, SourceImage};
pub use download::{
    save_all, save_one, BatchReport, BatchStatus, DirectoryTarget, SaveOutcome, SaveTarget,
    ShareOutcome, ShareTarget,
};
pub use encoder::{encode, encode_jpeg, encode_png, QualitySettings};
pub use geometry::{
    compute_grid_geometry, fit_rects, grid_position_percent, preview_dimensions, GridGeometry,
    Placement, Rect, ASPECT_TOLERANCE,
};
pub use io::Source;
pub use pool::BatchPolicy;
pub use resizer::{
    render_resize, resize, resize_preview, ResizeRequest, ResizeResult, ResizeSettings,
    DEFAULT_BACKGROUND, RESIZE_ENCODING,
};
pub use splitter::{
    render_tile, split_into_grid, SplitOptions, Tile, TileSet, TileSetSummary,
};
pub use tasks::{percent, CancellationToken, DownloadProgress, Outcome};
pub use urls::{BlobStore, MemoryBlobStore, ObjectUrlManager};
