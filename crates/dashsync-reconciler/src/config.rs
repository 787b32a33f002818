//! Configuration for the reconciliation loop

use crate::error::{ReconcileError, ReconcileResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconciliation loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Tag stamped on every managed dashboard; scopes search
    #[serde(default = "default_marker_tag")]
    pub marker_tag: String,

    /// Reconciliation interval in seconds
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,

    /// How often to check whether the document source has synced
    #[serde(default = "default_sync_poll_interval")]
    pub sync_poll_interval_ms: u64,

    /// Give up waiting for the initial sync after this many seconds
    #[serde(default)]
    pub sync_timeout_secs: Option<u64>,

    /// Log planned actions instead of applying them
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            marker_tag: default_marker_tag(),
            reconcile_interval_secs: default_reconcile_interval(),
            sync_poll_interval_ms: default_sync_poll_interval(),
            sync_timeout_secs: None,
            dry_run: false,
        }
    }
}

fn default_marker_tag() -> String {
    "dashsync-managed".to_string()
}

fn default_reconcile_interval() -> u64 {
    60
}

fn default_sync_poll_interval() -> u64 {
    100
}

impl ReconcilerConfig {
    pub fn with_marker_tag(marker_tag: impl Into<String>) -> Self {
        Self {
            marker_tag: marker_tag.into(),
            ..Default::default()
        }
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn sync_poll_interval(&self) -> Duration {
        Duration::from_millis(self.sync_poll_interval_ms)
    }

    pub fn sync_timeout(&self) -> Option<Duration> {
        self.sync_timeout_secs.map(Duration::from_secs)
    }

    /// Reject settings the loop cannot run with.
    ///
    /// An empty marker tag would scope search to every dashboard in the
    /// store, including ones this instance does not own.
    pub fn validate(&self) -> ReconcileResult<()> {
        if self.marker_tag.trim().is_empty() {
            return Err(ReconcileError::Config("marker tag must not be empty".into()));
        }
        if self.reconcile_interval_secs == 0 {
            return Err(ReconcileError::Config(
                "reconcile interval must be at least one second".into(),
            ));
        }
        if self.sync_poll_interval_ms == 0 {
            return Err(ReconcileError::Config(
                "sync poll interval must be positive".into(),
            ));
        }
        Ok(())
    }
}
