// src/engine/geometry.rs
//
// Fitting calculator: pure functions mapping a source raster onto a tile grid
// or a target box. No pixels are touched here.

use crate::ops::{FitPolicy, GridSpec};

/// Aspect ratios closer than this are treated as equal (no crop).
pub const ASPECT_TOLERANCE: f64 = 0.01;

/// Axis-aligned rectangle in fractional pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when `other` lies entirely inside `self` (with a small epsilon).
    pub fn contains_rect(&self, other: &Rect) -> bool {
        const EPS: f64 = 1e-6;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.bottom() <= self.bottom() + EPS
    }
}

/// Source-to-destination mapping for a single draw call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub src: Rect,
    pub dst: Rect,
}

/// Shared geometry of a grid split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridGeometry {
    /// Visible source region (centered crop matching the grid aspect).
    pub source: Rect,
    /// Edge of one tile in source pixels.
    pub raw_tile_size: f64,
    /// Edge of one output tile after the optional cap.
    pub tile_size: f64,
    /// `tile_size / raw_tile_size`; below 1.0 when the cap shrinks tiles.
    pub scale: f64,
}

impl GridGeometry {
    /// Source rectangle of tile `(row, col)`, offset from the shared crop origin.
    pub fn tile_source_rect(&self, row: u32, col: u32) -> Rect {
        Rect::new(
            self.source.x + col as f64 * self.raw_tile_size,
            self.source.y + row as f64 * self.raw_tile_size,
            self.raw_tile_size,
            self.raw_tile_size,
        )
    }

    /// Integer edge of the output surface (tiles are square).
    pub fn output_edge(&self) -> u32 {
        let edge = self.tile_size.round();
        if edge.is_finite() && edge >= 1.0 {
            edge.min(u32::MAX as f64) as u32
        } else {
            1
        }
    }
}

/// Compute the crop region and square tile size for a grid split.
///
/// Grid splitting always crops (never letterboxes): a source relatively wider
/// than the grid loses width, a relatively taller one loses height, centered.
pub fn compute_grid_geometry(
    src_width: u32,
    src_height: u32,
    grid: GridSpec,
    max_tile_size: Option<u32>,
) -> GridGeometry {
    let src_w = src_width as f64;
    let src_h = src_height as f64;
    let src_aspect = src_w / src_h;
    let grid_aspect = grid.aspect();

    let source = if (src_aspect - grid_aspect).abs() < ASPECT_TOLERANCE {
        Rect::from_size(src_w, src_h)
    } else if src_aspect > grid_aspect {
        let width = src_h * grid_aspect;
        Rect::new((src_w - width) / 2.0, 0.0, width, src_h)
    } else {
        let height = src_w / grid_aspect;
        Rect::new(0.0, (src_h - height) / 2.0, src_w, height)
    };

    let raw_tile_size =
        (source.width / grid.cols() as f64).min(source.height / grid.rows() as f64);
    let tile_size = match max_tile_size {
        Some(max) => raw_tile_size.min(max as f64),
        None => raw_tile_size,
    };
    let scale = if raw_tile_size > 0.0 {
        tile_size / raw_tile_size
    } else {
        1.0
    };

    GridGeometry {
        source,
        raw_tile_size,
        tile_size,
        scale,
    }
}

/// Map a source raster onto a `target_width x target_height` box.
pub fn fit_rects(
    src_width: u32,
    src_height: u32,
    target_width: u32,
    target_height: u32,
    policy: FitPolicy,
) -> Placement {
    let src_w = src_width as f64;
    let src_h = src_height as f64;
    let dst_w = target_width as f64;
    let dst_h = target_height as f64;
    let full_src = Rect::from_size(src_w, src_h);
    let full_dst = Rect::from_size(dst_w, dst_h);

    let src_aspect = src_w / src_h;
    let target_aspect = dst_w / dst_h;

    match policy {
        FitPolicy::Cover => {
            let src = if src_aspect > target_aspect {
                let width = src_h * target_aspect;
                Rect::new((src_w - width) / 2.0, 0.0, width, src_h)
            } else {
                let height = src_w / target_aspect;
                Rect::new(0.0, (src_h - height) / 2.0, src_w, height)
            };
            Placement { src, dst: full_dst }
        }
        FitPolicy::Contain => {
            let dst = if src_aspect > target_aspect {
                let height = dst_w / src_aspect;
                Rect::new(0.0, (dst_h - height) / 2.0, dst_w, height)
            } else {
                let width = dst_h * src_aspect;
                Rect::new((dst_w - width) / 2.0, 0.0, width, dst_h)
            };
            Placement { src: full_src, dst }
        }
        FitPolicy::Stretch => Placement {
            src: full_src,
            dst: full_dst,
        },
    }
}

/// Position of item `index` along an axis of `count` items, in percent,
/// for background-position style preview interpolation.
///
/// A single-item axis resolves to 0%.
pub fn grid_position_percent(index: u32, count: u32) -> f64 {
    if count <= 1 {
        return 0.0;
    }
    index.min(count - 1) as f64 / (count - 1) as f64 * 100.0
}

/// Scale a box down so its longest edge is at most `max_edge`. Never upscales.
pub fn preview_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if max_edge == 0 || longest <= max_edge {
        return (width, height);
    }
    let ratio = max_edge as f64 / longest as f64;
    (
        ((width as f64 * ratio).round() as u32).max(1),
        ((height as f64 * ratio).round() as u32).max(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cols: u32, rows: u32) -> GridSpec {
        GridSpec::new(cols, rows).unwrap()
    }

    mod grid_geometry {
        use super::*;

        #[test]
        fn matching_aspect_uses_whole_image() {
            let g = compute_grid_geometry(1200, 1200, grid(3, 3), None);
            assert_eq!(g.source, Rect::from_size(1200.0, 1200.0));
            assert_eq!(g.raw_tile_size, 400.0);
            assert_eq!(g.scale, 1.0);
        }

        #[test]
        fn near_matching_aspect_is_not_cropped() {
            // 1005/1000 = 1.005, within tolerance of 1.0
            let g = compute_grid_geometry(1005, 1000, grid(2, 2), None);
            assert_eq!(g.source.x, 0.0);
            assert_eq!(g.source.width, 1005.0);
            assert_eq!(g.raw_tile_size, 500.0);
        }

        #[test]
        fn wide_source_crops_width_centered() {
            let g = compute_grid_geometry(2000, 1000, grid(1, 1), None);
            assert_eq!(g.source, Rect::new(500.0, 0.0, 1000.0, 1000.0));
            assert_eq!(g.raw_tile_size, 1000.0);
        }

        #[test]
        fn tall_source_crops_height_centered() {
            let g = compute_grid_geometry(900, 1500, grid(3, 1), None);
            assert_eq!(g.source, Rect::new(0.0, 600.0, 900.0, 300.0));
            assert_eq!(g.raw_tile_size, 300.0);
        }

        #[test]
        fn cap_shrinks_tile_and_reports_scale() {
            let g = compute_grid_geometry(6000, 6000, grid(3, 3), Some(1080));
            assert_eq!(g.raw_tile_size, 2000.0);
            assert_eq!(g.tile_size, 1080.0);
            assert_eq!(g.output_edge(), 1080);
            assert!((g.scale - 0.54).abs() < 1e-9);
        }

        #[test]
        fn tile_rects_are_offset_from_crop_origin() {
            let g = compute_grid_geometry(2000, 1000, grid(2, 1), None);
            assert_eq!(g.tile_source_rect(0, 0), Rect::new(0.0, 0.0, 1000.0, 1000.0));
            assert_eq!(g.tile_source_rect(0, 1), Rect::new(1000.0, 0.0, 1000.0, 1000.0));

            let g = compute_grid_geometry(3000, 1000, grid(2, 1), None);
            assert_eq!(g.tile_source_rect(0, 1).x, 500.0 + 1000.0);
        }

        #[test]
        fn tiny_source_still_has_one_pixel_edge() {
            let g = compute_grid_geometry(2, 2, grid(5, 5), None);
            assert_eq!(g.output_edge(), 1);
        }
    }

    mod fit {
        use super::*;

        #[test]
        fn cover_wide_source_crops_width() {
            let p = fit_rects(2000, 1000, 1000, 1000, FitPolicy::Cover);
            assert_eq!(p.src, Rect::new(500.0, 0.0, 1000.0, 1000.0));
            assert_eq!(p.dst, Rect::from_size(1000.0, 1000.0));
        }

        #[test]
        fn cover_tall_source_crops_height() {
            let p = fit_rects(1000, 2000, 1600, 900, FitPolicy::Cover);
            assert_eq!(p.src.width, 1000.0);
            assert!((p.src.height - 562.5).abs() < 1e-9);
            assert!((p.src.y - 718.75).abs() < 1e-9);
            assert_eq!(p.dst, Rect::from_size(1600.0, 900.0));
        }

        #[test]
        fn contain_wide_source_letterboxes_vertically() {
            let p = fit_rects(2000, 1000, 1000, 1000, FitPolicy::Contain);
            assert_eq!(p.src, Rect::from_size(2000.0, 1000.0));
            assert_eq!(p.dst, Rect::new(0.0, 250.0, 1000.0, 500.0));
        }

        #[test]
        fn contain_tall_source_pillarboxes() {
            let p = fit_rects(1000, 2000, 1000, 1000, FitPolicy::Contain);
            assert_eq!(p.dst, Rect::new(250.0, 0.0, 500.0, 1000.0));
        }

        #[test]
        fn stretch_maps_full_to_full() {
            let p = fit_rects(123, 456, 1080, 1920, FitPolicy::Stretch);
            assert_eq!(p.src, Rect::from_size(123.0, 456.0));
            assert_eq!(p.dst, Rect::from_size(1080.0, 1920.0));
        }
    }

    #[test]
    fn grid_position_single_axis_is_zero() {
        assert_eq!(grid_position_percent(0, 1), 0.0);
        assert_eq!(grid_position_percent(0, 0), 0.0);
        assert_eq!(grid_position_percent(0, 3), 0.0);
        assert_eq!(grid_position_percent(1, 3), 50.0);
        assert_eq!(grid_position_percent(2, 3), 100.0);
    }

    #[test]
    fn preview_dimensions_caps_longest_edge() {
        assert_eq!(preview_dimensions(1080, 1920, 800), (450, 800));
        assert_eq!(preview_dimensions(1600, 900, 800), (800, 450));
        assert_eq!(preview_dimensions(400, 300, 800), (400, 300));
    }
}
