//! Local cache over the external file store.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use medway_core::types::Document;
use medway_core::Result;
use medway_providers::FileStore;

/// Tracks uploaded documents and their processing states.
///
/// All mutations go through the external `FileStore`; the tracker mirrors
/// the store's view so flow logic can check pending state synchronously.
#[derive(Clone)]
pub struct UploadTracker {
    store: Arc<dyn FileStore>,
    cache: Arc<Mutex<Vec<Document>>>,
}

impl UploadTracker {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self {
            store,
            cache: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Upload a file and record it locally.
    pub async fn upload(&self, name: &str, bytes: &[u8]) -> Result<Document> {
        let doc = self.store.upload(name, bytes).await?;
        tracing::debug!(id = %doc.id, name = %doc.name, "Document uploaded");
        self.cache
            .lock()
            .expect("cache mutex poisoned")
            .push(doc.clone());
        Ok(doc)
    }

    /// Delete a document from the store and the local cache.
    ///
    /// The cache entry is removed even if the remote delete fails; a
    /// dangling remote document is harmless, so the failure is propagated
    /// for logging only.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.cache
            .lock()
            .expect("cache mutex poisoned")
            .retain(|d| d.id != id);
        self.store.delete(id).await
    }

    /// Refresh the cache from the store. Returns the refreshed view.
    pub async fn refresh(&self) -> Result<Vec<Document>> {
        let docs = self.store.list_active().await?;
        *self.cache.lock().expect("cache mutex poisoned") = docs.clone();
        Ok(docs)
    }

    /// Current cached view without touching the store.
    pub fn documents(&self) -> Vec<Document> {
        self.cache.lock().expect("cache mutex poisoned").clone()
    }

    /// Whether any cached document is still processing.
    pub fn has_pending(&self) -> bool {
        self.cache
            .lock()
            .expect("cache mutex poisoned")
            .iter()
            .any(|d| d.is_pending())
    }

    /// Drop all cached documents (session reset).
    pub fn clear(&self) {
        self.cache.lock().expect("cache mutex poisoned").clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
