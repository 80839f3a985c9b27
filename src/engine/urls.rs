// src/engine/urls.rs
//
// Object-URL lifecycle: every URL handed out is tracked, and released
// exactly once - either by an explicit revoke or by revoke_all at teardown.

use crate::engine::canvas::Blob;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Platform primitive that mints and releases object URLs.
pub trait BlobStore: Send + Sync {
    fn create_url(&self, blob: Blob) -> String;
    fn revoke_url(&self, url: &str);
    fn resolve(&self, url: &str) -> Option<Blob>;
}

/// Process-local blob registry.
#[derive(Default)]
pub struct MemoryBlobStore {
    next_id: AtomicU64,
    blobs: Mutex<HashMap<String, Blob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn create_url(&self, blob: Blob) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!("blob:gridcut/{id}");
        self.blobs.lock().insert(url.clone(), blob);
        url
    }

    fn revoke_url(&self, url: &str) {
        self.blobs.lock().remove(url);
    }

    fn resolve(&self, url: &str) -> Option<Blob> {
        self.blobs.lock().get(url).cloned()
    }
}

/// Tracks the URLs it issues and guarantees their release.
pub struct ObjectUrlManager {
    store: Arc<dyn BlobStore>,
    issued: Mutex<HashSet<String>>,
}

impl ObjectUrlManager {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryBlobStore::new()))
    }

    pub fn with_store(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            issued: Mutex::new(HashSet::new()),
        }
    }

    pub fn create(&self, blob: Blob) -> String {
        let url = self.store.create_url(blob);
        self.issued.lock().insert(url.clone());
        url
    }

    /// Release `url`. Returns false (and does nothing) when the URL is not
    /// tracked, i.e. already revoked or issued elsewhere.
    pub fn revoke(&self, url: &str) -> bool {
        if !self.issued.lock().remove(url) {
            return false;
        }
        self.store.revoke_url(url);
        tracing::debug!(%url, "object url revoked");
        true
    }

    /// Release every tracked URL. Returns how many were released.
    pub fn revoke_all(&self) -> usize {
        let drained: Vec<String> = self.issued.lock().drain().collect();
        for url in &drained {
            self.store.revoke_url(url);
        }
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "object urls revoked");
        }
        drained.len()
    }

    /// Look up the blob behind a URL this manager issued.
    pub fn resolve(&self, url: &str) -> Option<Blob> {
        if !self.is_tracked(url) {
            return None;
        }
        self.store.resolve(url)
    }

    pub fn is_tracked(&self, url: &str) -> bool {
        self.issued.lock().contains(url)
    }

    pub fn len(&self) -> usize {
        self.issued.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.lock().is_empty()
    }
}

impl Default for ObjectUrlManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ObjectUrlManager {
    fn drop(&mut self) {
        self.revoke_all();
    }
}
