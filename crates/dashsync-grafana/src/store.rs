//! Dashboard store trait definition

use crate::dashboard::{DashboardDocument, RemoteDashboardRef};
use crate::error::StoreResult;
use crate::slug::Slug;
use async_trait::async_trait;

/// The remote store dashboards are reconciled into.
///
/// Each call is treated as independently atomic; retries, timeouts and
/// authentication are the implementation's business.
#[async_trait]
pub trait DashboardStore: Send + Sync {
    /// List dashboards carrying every one of `tags`
    async fn search(&self, tags: &[String]) -> StoreResult<Vec<RemoteDashboardRef>>;

    /// Create a dashboard
    async fn import(&self, dashboard: &DashboardDocument) -> StoreResult<()>;

    /// Create a dashboard, replacing any existing one with the same identity
    async fn import_and_overwrite(&self, dashboard: &DashboardDocument) -> StoreResult<()>;

    /// Delete a dashboard by slug
    async fn delete(&self, slug: &Slug) -> StoreResult<()>;
}
