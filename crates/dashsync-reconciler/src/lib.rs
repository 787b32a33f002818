//! # Dashsync Reconciler
//!
//! Keeps a dashboard store converged on the dashboards declared by
//! configuration documents.
//!
//! Each cycle collects the managed dashboards (those carrying the marker
//! tag) and the declared dashboards, computes a [`Plan`] of creates,
//! updates and deletes keyed by slug, and applies it through an
//! [`Effects`] implementation. The [`ReconciliationLoop`] runs cycles on an
//! interval and whenever the [`DocumentSource`] reports a change.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dashsync_grafana::InMemoryDashboardStore;
//! use dashsync_reconciler::{InMemoryDocumentSource, ReconcilerConfig, ReconciliationLoop};
//! use std::sync::Arc;
//!
//! # async fn example() -> dashsync_reconciler::ReconcileResult<()> {
//! let source = Arc::new(InMemoryDocumentSource::synced_with([]).await);
//! let store = Arc::new(InMemoryDashboardStore::new());
//! let reconciler = ReconciliationLoop::from_config(ReconcilerConfig::default(), source, store);
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! reconciler.run(shutdown_rx).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod apply;
pub mod collect;
pub mod config;
pub mod controller;
pub mod error;
pub mod plan;
pub mod source;

// Re-exports
pub use apply::{apply, DryRunEffects, Effects, LiveEffects};
pub use collect::{collect_actual, collect_desired};
pub use config::ReconcilerConfig;
pub use controller::{LoopState, ReconcileReport, ReconciliationLoop};
pub use error::{ApplyError, ReconcileError, ReconcileResult, SourceError};
pub use plan::{plan, Action, ActionKind, Plan, PlanCounts};
pub use source::{DocumentSource, InMemoryDocumentSource, SourceDocument};
