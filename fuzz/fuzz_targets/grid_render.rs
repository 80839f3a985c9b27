#![no_main]

use arbitrary::Arbitrary;
use gridcut::engine::{compute_grid_geometry, fit_rects, render_tile, Rect, SurfaceFactory};
use gridcut::{Encoding, ExportFormat, FitPolicy, GridSpec};
use image::{Rgba, RgbaImage};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    width: u16,
    height: u16,
    cols: u8,
    rows: u8,
    cap: u16,
    target_w: u16,
    target_h: u16,
    policy: u8,
    accelerated: bool,
}

fuzz_target!(|input: Input| {
    let width = input.width as u32 % 96 + 1;
    let height = input.height as u32 % 96 + 1;
    let Ok(grid) = GridSpec::new(input.cols as u32 % 8, input.rows as u32 % 8) else {
        return;
    };
    let cap = Some(input.cap as u32 % 128).filter(|&c| c > 0);

    let geometry = compute_grid_geometry(width, height, grid, cap);
    let full = Rect::from_size(width as f64, height as f64);
    assert!(full.contains_rect(&geometry.source));
    assert!(geometry.output_edge() >= 1);

    let policy = match input.policy % 3 {
        0 => FitPolicy::Cover,
        1 => FitPolicy::Contain,
        _ => FitPolicy::Stretch,
    };
    let target_w = input.target_w as u32 % 256 + 1;
    let target_h = input.target_h as u32 % 256 + 1;
    let placement = fit_rects(width, height, target_w, target_h, policy);
    assert!(full.contains_rect(&placement.src));
    assert!(Rect::from_size(target_w as f64, target_h as f64).contains_rect(&placement.dst));

    // Render only the last tile to keep iterations fast.
    let source = RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]));
    let Ok(format) = ExportFormat::new(Encoding::Png, 0.5, cap) else {
        return;
    };
    let tile = render_tile(
        &source,
        &geometry,
        grid,
        grid.total() - 1,
        format,
        SurfaceFactory::new(input.accelerated),
        false,
    );
    if let Ok(tile) = tile {
        assert_eq!(tile.post_order(), 1);
    }
});
