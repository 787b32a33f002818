//! Configuration document sources
//!
//! A source is the reconciler's view of the cluster-managed documents that
//! declare dashboards. It only has to hand out point-in-time listings and,
//! optionally, a wake-up stream that fires when anything changed.

mod memory;

pub use memory::InMemoryDocumentSource;

use crate::error::SourceError;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// One raw configuration document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Identifies the document in logs (namespaced name, file name, ...)
    pub key: String,
    /// Raw dashboard JSON
    pub payload: Vec<u8>,
}

impl SourceDocument {
    pub fn new(key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
        }
    }
}

/// Source of declared dashboards
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Whether the initial full listing has completed
    fn has_synced(&self) -> bool;

    /// Every currently known document, in no particular order
    async fn list_documents(&self) -> Result<Vec<SourceDocument>, SourceError>;

    /// Fires on any add, update or delete. Payload-free; only used to wake
    /// the loop early.
    fn subscribe(&self) -> Option<broadcast::Receiver<()>> {
        None
    }
}
