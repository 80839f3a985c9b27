// src/ops.rs
//
// Value types describing what to produce: grid layout, export format,
// fit policy, platform presets and output file names.
// These are cheap to create and copy - the expensive work happens in the engine.

use crate::engine::MAX_TILES;
use crate::error::{GridcutError, Result};
use image::Rgba;
use std::str::FromStr;

/// Tile layout of a grid split.
///
/// Invariant: `cols >= 1`, `rows >= 1` and `cols * rows <= MAX_TILES`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridSpec {
    cols: u32,
    rows: u32,
}

impl GridSpec {
    pub fn new(cols: u32, rows: u32) -> Result<Self> {
        if cols == 0 || rows == 0 || cols as u64 * rows as u64 > MAX_TILES {
            return Err(GridcutError::invalid_grid(cols, rows));
        }
        Ok(Self { cols, rows })
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Total tile count (`cols * rows`).
    pub fn total(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Width-to-height ratio of the grid.
    pub fn aspect(&self) -> f64 {
        self.cols as f64 / self.rows as f64
    }

    /// Row-major `(row, col)` for a linear tile index.
    pub fn position(&self, index: usize) -> (u32, u32) {
        let cols = self.cols as usize;
        ((index / cols) as u32, (index % cols) as u32)
    }

    /// Post order of a linear index: the top-left tile is posted last.
    pub fn post_order(&self, index: usize) -> usize {
        self.total() - index
    }
}

impl FromStr for GridSpec {
    type Err = GridcutError;

    /// Parse `"{cols}x{rows}"`, e.g. `"3x3"` or `"3x1"`.
    fn from_str(value: &str) -> Result<Self> {
        let invalid = || GridcutError::invalid_grid_spec(value.to_string());
        let (cols, rows) = value
            .trim()
            .split_once(|c: char| matches!(c, 'x' | 'X' | '×'))
            .ok_or_else(invalid)?;
        let cols = cols.trim().parse::<u32>().map_err(|_| invalid())?;
        let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;
        Self::new(cols, rows)
    }
}

impl std::fmt::Display for GridSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// Output encoding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    Jpeg,
    Png,
}

impl Encoding {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Encoding::Jpeg => "image/jpeg",
            Encoding::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Encoding::Jpeg => "jpg",
            Encoding::Png => "png",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Jpeg => "jpeg",
            Encoding::Png => "png",
        }
    }
}

/// Encoding, quality (0.0-1.0) and optional tile edge cap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportFormat {
    encoding: Encoding,
    quality: f32,
    max_dimension: Option<u32>,
}

impl ExportFormat {
    pub fn new(encoding: Encoding, quality: f32, max_dimension: Option<u32>) -> Result<Self> {
        if !(0.0..=1.0).contains(&quality) {
            return Err(GridcutError::invalid_quality(quality));
        }
        Ok(Self {
            encoding,
            quality,
            // A zero cap would produce empty tiles; treat it as "no cap".
            max_dimension: max_dimension.filter(|&max| max > 0),
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    pub fn max_dimension(&self) -> Option<u32> {
        self.max_dimension
    }
}

/// The three fixed tile export presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExportPreset {
    /// Compressed JPEG, quality 0.85, capped at 1080px
    Jpeg,
    /// PNG, quality 1.0, capped at 1080px
    PngStandard,
    /// Uncapped full-quality PNG
    PngHd,
}

/// Edge cap shared by the feed-sized presets.
pub const FEED_MAX_DIMENSION: u32 = 1080;

impl ExportPreset {
    pub fn format(&self) -> ExportFormat {
        match self {
            ExportPreset::Jpeg => ExportFormat {
                encoding: Encoding::Jpeg,
                quality: 0.85,
                max_dimension: Some(FEED_MAX_DIMENSION),
            },
            ExportPreset::PngStandard => ExportFormat {
                encoding: Encoding::Png,
                quality: 1.0,
                max_dimension: Some(FEED_MAX_DIMENSION),
            },
            ExportPreset::PngHd => ExportFormat {
                encoding: Encoding::Png,
                quality: 1.0,
                max_dimension: None,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportPreset::Jpeg => "jpeg",
            ExportPreset::PngStandard => "png-standard",
            ExportPreset::PngHd => "png-hd",
        }
    }
}

impl FromStr for ExportPreset {
    type Err = GridcutError;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png-standard" | "png" => Ok(Self::PngStandard),
            "png-hd" => Ok(Self::PngHd),
            _ => Err(GridcutError::invalid_export_preset(name.to_string())),
        }
    }
}

/// Rectangle-fitting policy for resize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FitPolicy {
    /// Crop-to-fill (`fill`)
    Cover,
    /// Pad-to-fit with a background color (`fit`)
    Contain,
    /// Non-uniform scale to the exact box
    Stretch,
}

impl FitPolicy {
    /// Mode identifier used at the caller boundary.
    pub fn as_str(&self) -> &'static str {
        match self {
            FitPolicy::Cover => "fill",
            FitPolicy::Contain => "fit",
            FitPolicy::Stretch => "stretch",
        }
    }
}

impl FromStr for FitPolicy {
    type Err = GridcutError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "fill" | "cover" => Ok(Self::Cover),
            "fit" | "contain" => Ok(Self::Contain),
            "stretch" => Ok(Self::Stretch),
            _ => Err(GridcutError::invalid_resize_mode(value.to_string())),
        }
    }
}

// =============================================================================
// PLATFORM PRESETS - Common target boxes for resize
// =============================================================================

/// A named platform target size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlatformPreset {
    pub name: &'static str,
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
}

pub const PLATFORM_PRESETS: &[PlatformPreset] = &[
    PlatformPreset {
        name: "instagram-square",
        label: "Instagram Post (Square)",
        width: 1080,
        height: 1080,
    },
    PlatformPreset {
        name: "instagram-portrait",
        label: "Instagram Post (Portrait)",
        width: 1080,
        height: 1350,
    },
    PlatformPreset {
        name: "instagram-story",
        label: "Instagram Story",
        width: 1080,
        height: 1920,
    },
    PlatformPreset {
        name: "twitter-post",
        label: "Twitter/X Post",
        width: 1600,
        height: 900,
    },
    PlatformPreset {
        name: "facebook-cover",
        label: "Facebook Cover",
        width: 820,
        height: 312,
    },
    PlatformPreset {
        name: "youtube-thumbnail",
        label: "YouTube Thumbnail",
        width: 1280,
        height: 720,
    },
    PlatformPreset {
        name: "linkedin-post",
        label: "LinkedIn Post",
        width: 1200,
        height: 627,
    },
    PlatformPreset {
        name: "pinterest-pin",
        label: "Pinterest Pin",
        width: 1000,
        height: 1500,
    },
];

impl PlatformPreset {
    /// Get the built-in preset by name
    pub fn get(name: &str) -> Result<Self> {
        let wanted = name.trim().to_lowercase();
        PLATFORM_PRESETS
            .iter()
            .find(|preset| preset.name == wanted)
            .copied()
            .ok_or_else(|| GridcutError::invalid_platform_preset(name.to_string()))
    }
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
pub fn parse_color(value: &str) -> Result<Rgba<u8>> {
    let invalid = || GridcutError::invalid_color(value.to_string());
    let hex = value.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

    match hex.len() {
        3 => {
            let mut out = [0u8, 0, 0, 255];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16).ok_or_else(invalid)? as u8;
                out[i] = v * 17;
            }
            Ok(Rgba(out))
        }
        6 | 8 => {
            let r = channel(&hex[0..2])?;
            let g = channel(&hex[2..4])?;
            let b = channel(&hex[4..6])?;
            let a = if hex.len() == 8 {
                channel(&hex[6..8])?
            } else {
                255
            };
            Ok(Rgba([r, g, b, a]))
        }
        _ => Err(invalid()),
    }
}

/// `tile_{post_order:02}.{ext}`
pub fn tile_file_name(post_order: usize, encoding: Encoding) -> String {
    format!("tile_{:02}.{}", post_order, encoding.extension())
}

/// `resized-{width}x{height}.{ext}`
pub fn resized_file_name(width: u32, height: u32, encoding: Encoding) -> String {
    format!("resized-{}x{}.{}", width, height, encoding.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_spec_parses_common_forms() {
        assert_eq!("3x3".parse::<GridSpec>().unwrap(), GridSpec::new(3, 3).unwrap());
        assert_eq!("3X1".parse::<GridSpec>().unwrap(), GridSpec::new(3, 1).unwrap());
        assert_eq!(" 2 × 4 ".parse::<GridSpec>().unwrap(), GridSpec::new(2, 4).unwrap());
    }

    #[test]
    fn grid_spec_rejects_garbage_and_zero() {
        assert!("3".parse::<GridSpec>().is_err());
        assert!("axb".parse::<GridSpec>().is_err());
        assert!("0x3".parse::<GridSpec>().is_err());
        assert!(GridSpec::new(3, 0).is_err());
    }

    #[test]
    fn grid_spec_tile_count_is_bounded() {
        assert!(GridSpec::new(100, 100).is_ok());
        assert!(matches!(
            GridSpec::new(101, 100),
            Err(GridcutError::InvalidGrid { cols: 101, rows: 100 })
        ));
        assert!(matches!(
            GridSpec::new(u32::MAX, u32::MAX),
            Err(GridcutError::InvalidGrid { .. })
        ));
    }

    #[test]
    fn grid_spec_positions_are_row_major() {
        let grid = GridSpec::new(3, 2).unwrap();
        assert_eq!(grid.total(), 6);
        assert_eq!(grid.position(0), (0, 0));
        assert_eq!(grid.position(2), (0, 2));
        assert_eq!(grid.position(3), (1, 0));
        assert_eq!(grid.position(5), (1, 2));
        assert_eq!(grid.post_order(0), 6);
        assert_eq!(grid.post_order(5), 1);
    }

    #[test]
    fn presets_match_fixed_formats() {
        let jpeg = ExportPreset::Jpeg.format();
        assert_eq!(jpeg.encoding(), Encoding::Jpeg);
        assert_eq!(jpeg.quality(), 0.85);
        assert_eq!(jpeg.max_dimension(), Some(1080));

        let standard = ExportPreset::PngStandard.format();
        assert_eq!(standard.encoding(), Encoding::Png);
        assert_eq!(standard.max_dimension(), Some(1080));

        assert_eq!(ExportPreset::PngHd.format().max_dimension(), None);
        assert_eq!("png-hd".parse::<ExportPreset>().unwrap(), ExportPreset::PngHd);
        assert!("webp".parse::<ExportPreset>().is_err());
    }

    #[test]
    fn export_format_rejects_out_of_range_quality() {
        assert!(ExportFormat::new(Encoding::Jpeg, 1.5, None).is_err());
        assert!(ExportFormat::new(Encoding::Jpeg, -0.1, None).is_err());
        assert!(ExportFormat::new(Encoding::Jpeg, f32::NAN, None).is_err());
        let format = ExportFormat::new(Encoding::Png, 0.5, Some(0)).unwrap();
        assert_eq!(format.max_dimension(), None);
    }

    #[test]
    fn fit_policy_accepts_mode_identifiers() {
        assert_eq!("fill".parse::<FitPolicy>().unwrap(), FitPolicy::Cover);
        assert_eq!("fit".parse::<FitPolicy>().unwrap(), FitPolicy::Contain);
        assert_eq!("stretch".parse::<FitPolicy>().unwrap(), FitPolicy::Stretch);
        assert_eq!("cover".parse::<FitPolicy>().unwrap(), FitPolicy::Cover);
        assert!("zoom".parse::<FitPolicy>().is_err());
    }

    #[test]
    fn platform_preset_lookup() {
        let story = PlatformPreset::get("Instagram-Story").unwrap();
        assert_eq!((story.width, story.height), (1080, 1920));
        assert!(PlatformPreset::get("myspace").is_err());
    }

    #[test]
    fn parse_color_forms() {
        assert_eq!(parse_color("#fff").unwrap(), Rgba([255, 255, 255, 255]));
        assert_eq!(parse_color("#102030").unwrap(), Rgba([16, 32, 48, 255]));
        assert_eq!(parse_color("10203080").unwrap(), Rgba([16, 32, 48, 128]));
        assert!(parse_color("#12").is_err());
        assert!(parse_color("#gggggg").is_err());
    }

    #[test]
    fn file_names_follow_patterns() {
        assert_eq!(tile_file_name(9, Encoding::Png), "tile_09.png");
        assert_eq!(tile_file_name(12, Encoding::Jpeg), "tile_12.jpg");
        assert_eq!(resized_file_name(1080, 1350, Encoding::Png), "resized-1080x1350.png");
    }
}
