// src/engine/common.rs
//
// Common utilities shared across engine modules.
// Provides the engine result alias and the panic policy for raster/codec work.

use crate::error::GridcutError;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Engine-wide result type. Always carries `GridcutError` so the error
/// taxonomy survives from the raster layer up to the caller boundary.
pub type EngineResult<T> = std::result::Result<T, GridcutError>;

/// Run raster/codec work, converting a panic into `GridcutError::InternalPanic`.
///
/// Codec and resampler crates occasionally panic on pathological input;
/// the caller must only ever observe an error value.
pub fn run_with_panic_policy<T, F>(stage: &'static str, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            tracing::error!(target: "gridcut::panic", %stage, %detail, "panic caught");
            Err(GridcutError::internal_panic(format!("{stage}: {detail}")))
        }
    }
}

/// Human-readable byte size (`512 B`, `12.3 KB`, `1.20 MB`).
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.2} MB", b / MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_becomes_internal_error() {
        let result: EngineResult<()> = run_with_panic_policy("test", || panic!("boom"));
        let err = result.unwrap_err();
        assert!(matches!(err, GridcutError::InternalPanic { .. }));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn ok_passes_through() {
        assert_eq!(run_with_panic_policy("test", || Ok(7)).unwrap(), 7);
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }
}
