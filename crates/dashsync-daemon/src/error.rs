//! Daemon error types

use dashsync_grafana::StoreError;
use dashsync_reconciler::ReconcileError;
use thiserror::Error;

/// Daemon error types
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dashboard store setup error
    #[error("Dashboard store error: {0}")]
    Store(#[from] StoreError),

    /// Reconciliation loop error
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Kubernetes client error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for DaemonError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
