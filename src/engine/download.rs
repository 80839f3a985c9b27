// src/engine/download.rs
//
// Batch download orchestration.
//
// Saves run strictly one at a time in ascending post order, spaced by a
// fixed delay: platform download managers tend to drop rapid-fire save
// triggers. A failing file is logged and skipped; the batch continues.

use crate::engine::canvas::Blob;
use crate::engine::common::EngineResult;
use crate::engine::config::Capabilities;
use crate::engine::splitter::Tile;
use crate::engine::tasks::{CancellationToken, DownloadProgress};
use crate::error::GridcutError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Single-file save primitive.
///
/// `save` may block; batch saves call it on the blocking pool.
pub trait SaveTarget: Send + Sync {
    fn save(&self, file_name: &str, blob: &Blob) -> EngineResult<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    /// The user closed the share sheet without picking a destination.
    Dismissed,
}

/// Native share sheet.
pub trait ShareTarget: Send + Sync {
    fn can_share(&self, mime_type: &str) -> bool;
    fn share(&self, file_name: &str, blob: &Blob) -> EngineResult<ShareOutcome>;
}

/// Writes each file into a directory, creating it on first use.
#[derive(Clone, Debug)]
pub struct DirectoryTarget {
    dir: PathBuf,
}

impl DirectoryTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveTarget for DirectoryTarget {
    fn save(&self, file_name: &str, blob: &Blob) -> EngineResult<()> {
        // Only the final component is honored; names never escape the directory.
        let name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| GridcutError::save_failed(file_name.to_string(), "empty file name"))?;
        let path = self.dir.join(name);
        let display = path.to_string_lossy().to_string();

        std::fs::create_dir_all(&self.dir)
            .map_err(|e| GridcutError::file_write_failed(display.clone(), e))?;
        std::fs::write(&path, blob.as_slice())
            .map_err(|e| GridcutError::file_write_failed(display, e))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    AllSucceeded,
    Partial,
    Failed,
}

/// Result of a batch save.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchReport {
    pub success_count: usize,
    pub total: usize,
    /// The run stopped early on cancellation.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn status(&self) -> BatchStatus {
        if self.success_count == 0 {
            BatchStatus::Failed
        } else if self.success_count == self.total {
            BatchStatus::AllSucceeded
        } else {
            BatchStatus::Partial
        }
    }

    pub fn failed_count(&self) -> usize {
        self.total - self.success_count
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cancelled {
            return write!(
                f,
                "Stopped after saving {} of {} files",
                self.success_count, self.total
            );
        }
        match self.status() {
            BatchStatus::AllSucceeded => write!(f, "Saved all {} files", self.total),
            BatchStatus::Partial => write!(
                f,
                "Saved {} of {} files; {} failed",
                self.success_count,
                self.total,
                self.failed_count()
            ),
            BatchStatus::Failed => write!(f, "No files could be saved"),
        }
    }
}

/// Save every tile, in ascending post order, one at a time.
///
/// `on_progress` gets `{current, total}` after each attempt. `delay` is
/// waited between items, never after the last. Cancellation is checked
/// before each item and stops the loop without error; files already saved
/// stay saved. Each save runs on the blocking pool.
pub async fn save_all<N, P>(
    tiles: &[Tile],
    file_namer: N,
    target: Arc<dyn SaveTarget>,
    delay: Duration,
    mut on_progress: P,
    cancel: &CancellationToken,
) -> EngineResult<BatchReport>
where
    N: Fn(&Tile) -> String,
    P: FnMut(DownloadProgress),
{
    if tiles.is_empty() {
        return Err(GridcutError::nothing_to_save("no tiles"));
    }

    let mut ordered: Vec<&Tile> = tiles.iter().collect();
    ordered.sort_by_key(|t| t.post_order());
    let total = ordered.len();

    let mut report = BatchReport {
        success_count: 0,
        total,
        cancelled: false,
    };

    for (i, tile) in ordered.into_iter().enumerate() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            tracing::warn!(saved = report.success_count, total, "batch save cancelled");
            return Ok(report);
        }

        let file_name = file_namer(tile);
        let saver = Arc::clone(&target);
        let blob = tile.blob().clone();
        let name = file_name.clone();
        let result = tokio::task::spawn_blocking(move || saver.save(&name, &blob))
            .await
            .map_err(|e| GridcutError::internal_panic(format!("save task failed: {e}")))
            .and_then(|saved| saved);
        match result {
            Ok(()) => report.success_count += 1,
            Err(err) => {
                tracing::warn!(file = %file_name, error = %err, "save failed, skipping");
            }
        }
        on_progress(DownloadProgress::new(i + 1, total));

        if i + 1 < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    tracing::info!(
        saved = report.success_count,
        total,
        status = ?report.status(),
        "batch save finished"
    );
    Ok(report)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Shared,
    Dismissed,
}

/// Save a single blob, preferring the share sheet on mobile when it accepts
/// the blob's MIME type. A share error falls back to a plain save.
pub fn save_one(
    file_name: &str,
    blob: &Blob,
    capabilities: Capabilities,
    target: &dyn SaveTarget,
    share: Option<&dyn ShareTarget>,
) -> EngineResult<SaveOutcome> {
    let sharer = share.filter(|s| {
        capabilities.is_mobile() && capabilities.can_share_files() && s.can_share(blob.mime_type())
    });

    if let Some(sharer) = sharer {
        match sharer.share(file_name, blob) {
            Ok(ShareOutcome::Shared) => return Ok(SaveOutcome::Shared),
            Ok(ShareOutcome::Dismissed) => {
                tracing::debug!(file = %file_name, "share dismissed");
                return Ok(SaveOutcome::Dismissed);
            }
            Err(err) => {
                tracing::warn!(file = %file_name, error = %err, "share failed, saving instead");
            }
        }
    }

    target.save(file_name, blob)?;
    Ok(SaveOutcome::Saved)
}
