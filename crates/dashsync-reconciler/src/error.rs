//! Error types for the reconciliation engine

use crate::plan::ActionKind;
use dashsync_grafana::{Slug, StoreError};
use std::time::Duration;
use thiserror::Error;

/// Document source error type
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source has not completed its initial listing
    #[error("document source has not synced yet")]
    NotSynced,

    /// Reading documents from disk failed
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The source cannot be enumerated right now
    #[error("document source unavailable: {0}")]
    Unavailable(String),
}

/// A single plan action that failed
#[derive(Debug, Error)]
#[error("unable to {kind} dashboard {slug}: {source}")]
pub struct ApplyError {
    pub kind: ActionKind,
    pub slug: Slug,
    #[source]
    pub source: StoreError,
}

/// Reconciliation error type
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Listing managed dashboards failed; aborts the current cycle
    #[error("failed to list dashboards declared in the store: {0}")]
    Store(#[from] StoreError),

    /// Listing configuration documents failed; aborts the current cycle
    #[error("failed to list dashboards declared in configuration documents: {0}")]
    Source(#[from] SourceError),

    /// Cancelled before the document source ever synced
    #[error("cancelled before the document source synced")]
    NotSynced,

    /// The document source did not sync in time
    #[error("document source did not sync within {0:?}")]
    SyncTimeout(Duration),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl ReconcileError {
    /// Whether the error prevents the loop from ever reconciling
    pub fn is_startup(&self) -> bool {
        matches!(self, Self::NotSynced | Self::SyncTimeout(_) | Self::Config(_))
    }
}

/// Result type for reconciliation
pub type ReconcileResult<T> = Result<T, ReconcileError>;
