//! In-memory document source

use super::{DocumentSource, SourceDocument};
use crate::error::SourceError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// In-memory document source for development and testing.
///
/// Starts unsynced; call [`Self::mark_synced`] to complete the "initial
/// listing". Every mutation sends a change notification.
#[derive(Debug, Clone)]
pub struct InMemoryDocumentSource {
    documents: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    synced: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
    changes: broadcast::Sender<()>,
}

impl Default for InMemoryDocumentSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentSource {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            documents: Arc::new(RwLock::new(BTreeMap::new())),
            synced: Arc::new(AtomicBool::new(false)),
            failing: Arc::new(AtomicBool::new(false)),
            changes,
        }
    }

    /// A source that is already synced and holds `documents`
    pub async fn synced_with(documents: impl IntoIterator<Item = SourceDocument>) -> Self {
        let source = Self::new();
        {
            let mut map = source.documents.write().await;
            for doc in documents {
                map.insert(doc.key, doc.payload);
            }
        }
        source.mark_synced();
        source
    }

    pub fn mark_synced(&self) {
        self.synced.store(true, Ordering::SeqCst);
    }

    /// Make listing fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn upsert(&self, key: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.documents
            .write()
            .await
            .insert(key.into(), payload.into());
        self.notify();
    }

    pub async fn remove(&self, key: &str) -> bool {
        let removed = self.documents.write().await.remove(key).is_some();
        if removed {
            self.notify();
        }
        removed
    }

    fn notify(&self) {
        // No subscribers is fine
        let _ = self.changes.send(());
    }
}

#[async_trait]
impl DocumentSource for InMemoryDocumentSource {
    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    async fn list_documents(&self) -> Result<Vec<SourceDocument>, SourceError> {
        if !self.has_synced() {
            return Err(SourceError::NotSynced);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("listing disabled".into()));
        }

        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .map(|(key, payload)| SourceDocument::new(key.clone(), payload.clone()))
            .collect())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<()>> {
        Some(self.changes.subscribe())
    }
}
