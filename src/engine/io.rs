// src/engine/io.rs
//
// I/O operations: the Source enum and byte loading.

use crate::engine::urls::ObjectUrlManager;
use crate::error::GridcutError;
use std::path::PathBuf;
use std::sync::Arc;

/// Image source: in-memory bytes, a file path read on demand, or an object
/// URL previously issued by an [`ObjectUrlManager`].
#[derive(Clone, Debug)]
pub enum Source {
    /// In-memory image data
    Memory(Arc<[u8]>),
    /// File path (data is read only when the source is loaded)
    Path(PathBuf),
    /// Object URL resolving to an in-memory blob
    ObjectUrl(String),
}

impl Source {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Source::Memory(Arc::from(bytes.into()))
    }

    /// Resolve an object URL into its in-memory bytes. Other variants pass through.
    ///
    /// The returned source no longer depends on the manager, so it can be
    /// moved onto a blocking task.
    pub fn resolve(self, urls: &ObjectUrlManager) -> std::result::Result<Self, GridcutError> {
        match self {
            Source::ObjectUrl(url) => match urls.resolve(&url) {
                Some(blob) => Ok(Source::Memory(blob.bytes())),
                None => Err(GridcutError::unknown_object_url(url)),
            },
            other => Ok(other),
        }
    }

    /// Load the actual bytes from the source.
    pub fn load(&self) -> std::result::Result<Arc<[u8]>, GridcutError> {
        match self {
            Source::Memory(data) => Ok(Arc::clone(data)),
            Source::Path(path) => {
                let data = std::fs::read(path).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        GridcutError::file_not_found(path.to_string_lossy().to_string())
                    } else {
                        GridcutError::file_read_failed(path.to_string_lossy().to_string(), e)
                    }
                })?;
                Ok(Arc::from(data))
            }
            Source::ObjectUrl(url) => Err(GridcutError::unknown_object_url(url.clone())),
        }
    }

    /// Get path if this is a Path source
    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            Source::Path(p) => Some(p),
            Source::Memory(_) | Source::ObjectUrl(_) => None,
        }
    }
}
