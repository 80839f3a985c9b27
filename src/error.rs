// src/error.rs
//
// Unified error handling for gridcut
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - UserError: Invalid input, recoverable
// - CodecError: Format/encoding/raster issues
// - ResourceLimit: Memory/dimension/file-system limits
// - InternalBug: Library bugs (should not happen)

use std::borrow::Cow;
use thiserror::Error;

/// Error taxonomy used by callers to tailor user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Invalid input, recoverable by user
    UserError,
    /// Format/encoding issues
    CodecError,
    /// Memory/dimension/file-system limits
    ResourceLimit,
    /// Library bugs (should not happen)
    InternalBug,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "UserError",
            ErrorCategory::CodecError => "CodecError",
            ErrorCategory::ResourceLimit => "ResourceLimit",
            ErrorCategory::InternalBug => "InternalBug",
        }
    }

    /// Get the GRIDCUT_* error code string for this category
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "GRIDCUT_USER_ERROR",
            ErrorCategory::CodecError => "GRIDCUT_CODEC_ERROR",
            ErrorCategory::ResourceLimit => "GRIDCUT_RESOURCE_LIMIT",
            ErrorCategory::InternalBug => "GRIDCUT_INTERNAL_BUG",
        }
    }
}

/// gridcut error types
///
/// Platform- and codec-specific failures are normalized into these variants
/// before they reach the caller.
#[derive(Debug, Error)]
pub enum GridcutError {
    // File I/O Errors
    #[error("File not found: {path}")]
    FileNotFound { path: Cow<'static, str> },

    #[error("Failed to read file '{path}': {source}")]
    FileReadFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWriteFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    // Decode Errors
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: Cow<'static, str> },

    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    // Size Limit Errors
    #[error("Image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    // Input Errors
    #[error(
        "Invalid grid {cols}x{rows}: columns and rows must be at least 1, with at most {max} tiles",
        max = crate::engine::MAX_TILES
    )]
    InvalidGrid { cols: u32, rows: u32 },

    #[error("Invalid grid spec '{value}'. Expected '{{cols}}x{{rows}}', e.g. '3x3'")]
    InvalidGridSpec { value: Cow<'static, str> },

    #[error("Invalid resize dimensions: width={width}, height={height}")]
    InvalidResizeDimensions { width: u32, height: u32 },

    #[error("Invalid resize mode: '{value}'. Expected fill, fit, or stretch")]
    InvalidResizeMode { value: Cow<'static, str> },

    #[error("Unknown export preset: '{name}'. Available: jpeg, png-standard, png-hd")]
    InvalidExportPreset { name: Cow<'static, str> },

    #[error("Unknown platform preset: '{name}'")]
    InvalidPlatformPreset { name: Cow<'static, str> },

    #[error("Invalid quality {quality}: must be within 0.0..=1.0")]
    InvalidQuality { quality: f32 },

    #[error("Invalid color '{value}'. Expected #rgb, #rrggbb or #rrggbbaa")]
    InvalidColor { value: Cow<'static, str> },

    // Raster Errors
    #[error("No 2D drawing context available for a {width}x{height} surface: {reason}")]
    ContextUnavailable {
        width: u32,
        height: u32,
        reason: Cow<'static, str>,
    },

    #[error("Failed to draw onto surface: {message}")]
    DrawFailed { message: Cow<'static, str> },

    // Encode Errors
    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Artifact Errors
    #[error("Unknown or revoked object URL: {url}")]
    UnknownObjectUrl { url: Cow<'static, str> },

    #[error("Nothing to save: {what}")]
    NothingToSave { what: Cow<'static, str> },

    #[error("Failed to save '{file_name}': {message}")]
    SaveFailed {
        file_name: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Failed to share '{file_name}': {message}")]
    ShareFailed {
        file_name: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Internal Errors
    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },

    // Generic Error
    #[error("{message}")]
    Generic { message: Cow<'static, str> },
}

// Constructor Helpers
impl GridcutError {
    pub fn file_not_found(path: impl Into<Cow<'static, str>>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn file_read_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn file_write_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn unsupported_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn invalid_grid(cols: u32, rows: u32) -> Self {
        Self::InvalidGrid { cols, rows }
    }

    pub fn invalid_grid_spec(value: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidGridSpec {
            value: value.into(),
        }
    }

    pub fn invalid_resize_dimensions(width: u32, height: u32) -> Self {
        Self::InvalidResizeDimensions { width, height }
    }

    pub fn invalid_resize_mode(value: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidResizeMode {
            value: value.into(),
        }
    }

    pub fn invalid_export_preset(name: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidExportPreset { name: name.into() }
    }

    pub fn invalid_platform_preset(name: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidPlatformPreset { name: name.into() }
    }

    pub fn invalid_quality(quality: f32) -> Self {
        Self::InvalidQuality { quality }
    }

    pub fn invalid_color(value: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidColor {
            value: value.into(),
        }
    }

    pub fn context_unavailable(
        width: u32,
        height: u32,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ContextUnavailable {
            width,
            height,
            reason: reason.into(),
        }
    }

    pub fn draw_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DrawFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn unknown_object_url(url: impl Into<Cow<'static, str>>) -> Self {
        Self::UnknownObjectUrl { url: url.into() }
    }

    pub fn nothing_to_save(what: impl Into<Cow<'static, str>>) -> Self {
        Self::NothingToSave { what: what.into() }
    }

    pub fn save_failed(
        file_name: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::SaveFailed {
            file_name: file_name.into(),
            message: message.into(),
        }
    }

    pub fn share_failed(
        file_name: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ShareFailed {
            file_name: file_name.into(),
            message: message.into(),
        }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    pub fn generic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (user can fix it)
    ///
    /// Consistent with category(): UserError and ResourceLimit are recoverable,
    /// CodecError and InternalBug are not.
    pub fn is_recoverable(&self) -> bool {
        match self.category() {
            ErrorCategory::UserError | ErrorCategory::ResourceLimit => true,
            ErrorCategory::CodecError | ErrorCategory::InternalBug => false,
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            // UserError: Invalid input, recoverable
            Self::FileNotFound { .. }
            | Self::InvalidGrid { .. }
            | Self::InvalidGridSpec { .. }
            | Self::InvalidResizeDimensions { .. }
            | Self::InvalidResizeMode { .. }
            | Self::InvalidExportPreset { .. }
            | Self::InvalidPlatformPreset { .. }
            | Self::InvalidQuality { .. }
            | Self::InvalidColor { .. }
            | Self::UnknownObjectUrl { .. }
            | Self::NothingToSave { .. } => ErrorCategory::UserError,

            // CodecError: Format/encoding/raster issues
            Self::UnsupportedFormat { .. }
            | Self::DecodeFailed { .. }
            | Self::EncodeFailed { .. }
            | Self::DrawFailed { .. } => ErrorCategory::CodecError,

            // ResourceLimit: a surface that cannot get a context is almost always
            // an allocation ceiling; save/share failures are platform-side.
            Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. }
            | Self::ContextUnavailable { .. }
            | Self::FileReadFailed { .. }
            | Self::FileWriteFailed { .. }
            | Self::SaveFailed { .. }
            | Self::ShareFailed { .. } => ErrorCategory::ResourceLimit,

            // InternalBug: Library bugs (should not happen)
            Self::InternalPanic { .. } | Self::Generic { .. } => ErrorCategory::InternalBug,
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, GridcutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GridcutError::file_not_found("/path/to/file.jpg");
        assert!(err.to_string().contains("/path/to/file.jpg"));

        let err = GridcutError::invalid_grid_spec("3by3");
        assert!(err.to_string().contains("'3by3'"));
        assert!(err.to_string().contains("{cols}x{rows}"));
    }

    #[test]
    fn test_error_recoverable() {
        assert!(GridcutError::invalid_grid(0, 3).is_recoverable());
        assert!(GridcutError::context_unavailable(1, 1, "test").is_recoverable());
        assert!(GridcutError::save_failed("tile_01.png", "disk full").is_recoverable());
        assert!(!GridcutError::decode_failed("test").is_recoverable());
        assert!(!GridcutError::encode_failed("png", "test").is_recoverable());
        assert!(!GridcutError::internal_panic("test").is_recoverable());
    }

    #[test]
    fn test_error_category_user_error() {
        assert_eq!(
            GridcutError::invalid_grid(0, 0).category(),
            ErrorCategory::UserError
        );
        assert_eq!(
            GridcutError::invalid_resize_mode("zoom").category(),
            ErrorCategory::UserError
        );
        assert_eq!(
            GridcutError::invalid_export_preset("webp").category(),
            ErrorCategory::UserError
        );
        assert_eq!(
            GridcutError::unknown_object_url("blob:gridcut/1").category(),
            ErrorCategory::UserError
        );
    }

    #[test]
    fn test_error_category_codec_error() {
        assert_eq!(
            GridcutError::unsupported_format("tiff").category(),
            ErrorCategory::CodecError
        );
        assert_eq!(
            GridcutError::decode_failed("test").category(),
            ErrorCategory::CodecError
        );
        assert_eq!(
            GridcutError::draw_failed("test").category(),
            ErrorCategory::CodecError
        );
    }

    #[test]
    fn test_error_category_resource_limit() {
        assert_eq!(
            GridcutError::dimension_exceeds_limit(40000, 32768).category(),
            ErrorCategory::ResourceLimit
        );
        assert_eq!(
            GridcutError::file_write_failed(
                "tile_01.png",
                std::io::Error::from(std::io::ErrorKind::PermissionDenied)
            )
            .category(),
            ErrorCategory::ResourceLimit
        );
    }

    #[test]
    fn test_error_category_internal_bug() {
        assert_eq!(
            GridcutError::internal_panic("test").category(),
            ErrorCategory::InternalBug
        );
        assert_eq!(
            GridcutError::generic("test").category(),
            ErrorCategory::InternalBug
        );
    }

    #[test]
    fn test_error_category_codes() {
        assert_eq!(ErrorCategory::UserError.as_str(), "UserError");
        assert_eq!(ErrorCategory::CodecError.code(), "GRIDCUT_CODEC_ERROR");
        assert_eq!(ErrorCategory::ResourceLimit.code(), "GRIDCUT_RESOURCE_LIMIT");
    }
}
