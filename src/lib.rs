// lib.rs
//
// gridcut: grid tile splitting and platform resizing for social-media posts
//
// Design goals:
// - Decode once, crop with pure geometry, rasterize off the executor
// - Square tiles in upload order (the top-left tile is posted last)
// - Cover/contain/stretch resize to exact platform boxes
// - Every generated blob URL is released exactly once

pub mod engine;
pub mod error;
pub mod ops;

use crate::error::GridcutError;
use image::ImageReader;
use std::io::{BufRead, BufReader, Cursor, Seek};

pub use engine::{EngineConfig, ImageEngine, Source};
pub use error::{ErrorCategory, GridcutError as Error, Result};
pub use ops::{
    parse_color, resized_file_name, tile_file_name, Encoding, ExportFormat, ExportPreset,
    FitPolicy, GridSpec, PlatformPreset, PLATFORM_PRESETS,
};

/// Header-level facts about an image, read without decoding pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<String>,
}

fn read_inspect_metadata<R: BufRead + Seek>(reader: R) -> Result<InspectMetadata> {
    let reader = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(|e| GridcutError::decode_failed(format!("failed to read image header: {e}")))?;

    let format = reader.format().map(|f| format!("{:?}", f).to_lowercase());
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| GridcutError::decode_failed(format!("failed to read dimensions: {e}")))?;

    Ok(InspectMetadata {
        width,
        height,
        format,
    })
}

/// Read dimensions and format from the header bytes only.
///
/// Use this to reject oversized sources before a split or resize.
pub fn inspect_header_from_bytes(data: &[u8]) -> Result<InspectMetadata> {
    read_inspect_metadata(Cursor::new(data))
}

pub fn inspect_header_from_path(path: &str) -> Result<InspectMetadata> {
    use std::fs::File;

    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            GridcutError::file_not_found(path.to_string())
        } else {
            GridcutError::file_read_failed(path.to_string(), e)
        }
    })?;
    read_inspect_metadata(BufReader::new(file))
}

/// Get library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Source encodings the decoder accepts.
pub fn supported_input_formats() -> &'static [&'static str] {
    &["jpeg", "jpg", "png"]
}

/// Names accepted by `ExportPreset::from_str`.
pub fn supported_export_presets() -> &'static [&'static str] {
    &["jpeg", "png-standard", "png-hd"]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn inspect_reads_header() {
        let meta = inspect_header_from_bytes(&png_bytes(33, 17)).unwrap();
        assert_eq!((meta.width, meta.height), (33, 17));
        assert_eq!(meta.format.as_deref(), Some("png"));
    }

    #[test]
    fn inspect_rejects_garbage() {
        assert!(inspect_header_from_bytes(b"nope").is_err());
    }

    #[test]
    fn inspect_missing_file() {
        let err = inspect_header_from_path("/no/such/file.png").unwrap_err();
        assert!(matches!(err, GridcutError::FileNotFound { .. }));
    }

    #[test]
    fn every_listed_preset_parses() {
        for name in supported_export_presets() {
            assert!(name.parse::<ExportPreset>().is_ok(), "{name}");
        }
    }
}
