//! # Dashsync Grafana
//!
//! Dashboard documents and the remote dashboard store they are synchronized
//! into.
//!
//! ## Key Components
//!
//! - [`DashboardDocument`]: a declared dashboard, parsed from raw JSON
//! - [`RemoteDashboardRef`]: a dashboard already present in the store
//! - [`Slug`]: the stable identity shared by both sides
//! - [`DashboardStore`]: the narrow transactional interface of the store
//! - [`GrafanaClient`]: [`DashboardStore`] over the Grafana HTTP API
//! - [`InMemoryDashboardStore`]: map-backed store for tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use dashsync_grafana::{DashboardDocument, DashboardStore, GrafanaAuth, GrafanaClient};
//!
//! # async fn example() -> dashsync_grafana::StoreResult<()> {
//! let client = GrafanaClient::new(
//!     "http://grafana:3000",
//!     GrafanaAuth::api_key("secret")?,
//!     reqwest::Client::new(),
//! )?;
//!
//! let mut dashboard = DashboardDocument::from_slice(br#"{"dashboard": {"title": "Node Exporter"}}"#)?;
//! dashboard.add_tag("managed")?;
//! client.import(&dashboard).await?;
//!
//! let managed = client.search(&["managed".to_string()]).await?;
//! println!("{} managed dashboards", managed.len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod client;
pub mod dashboard;
pub mod error;
pub mod memory;
pub mod slug;
pub mod store;

// Re-exports
pub use client::{GrafanaAuth, GrafanaClient};
pub use dashboard::{parse_search_results, DashboardDocument, RemoteDashboardRef};
pub use error::{DocumentError, StoreError, StoreResult};
pub use memory::{InMemoryDashboardStore, StoreCall};
pub use slug::{slugify, Slug};
pub use store::DashboardStore;
