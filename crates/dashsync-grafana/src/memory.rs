//! In-memory dashboard store

use crate::dashboard::{DashboardDocument, RemoteDashboardRef};
use crate::error::{StoreError, StoreResult};
use crate::slug::Slug;
use crate::store::DashboardStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A call observed by [`InMemoryDashboardStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Search(Vec<String>),
    Import(Slug),
    ImportAndOverwrite(Slug),
    Delete(Slug),
}

/// In-memory dashboard store for development and testing.
///
/// Mirrors the Grafana semantics the reconciler relies on: a plain import
/// of an existing dashboard is rejected, an overwrite-import replaces it and
/// deleting a missing dashboard is an error. Failures can be injected per
/// slug or for search.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDashboardStore {
    dashboards: Arc<RwLock<BTreeMap<Slug, DashboardDocument>>>,
    calls: Arc<RwLock<Vec<StoreCall>>>,
    failing: Arc<RwLock<HashSet<Slug>>>,
    fail_search: Arc<AtomicBool>,
}

impl InMemoryDashboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a dashboard without recording a call
    pub async fn insert(&self, dashboard: DashboardDocument) -> StoreResult<Slug> {
        let slug = dashboard.slug()?;
        self.dashboards.write().await.insert(slug.clone(), dashboard);
        Ok(slug)
    }

    pub async fn get(&self, slug: &Slug) -> Option<DashboardDocument> {
        self.dashboards.read().await.get(slug).cloned()
    }

    pub async fn slugs(&self) -> Vec<Slug> {
        self.dashboards.read().await.keys().cloned().collect()
    }

    /// Every call made so far, oldest first
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.calls.read().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    /// Make every mutation of `slug` fail until [`Self::heal`] is called
    pub async fn fail_on(&self, slug: Slug) {
        self.failing.write().await.insert(slug);
    }

    pub async fn heal(&self, slug: &Slug) {
        self.failing.write().await.remove(slug);
    }

    pub fn set_search_failing(&self, failing: bool) {
        self.fail_search.store(failing, Ordering::SeqCst);
    }

    async fn record(&self, call: StoreCall) {
        self.calls.write().await.push(call);
    }

    async fn check_failing(&self, slug: &Slug) -> StoreResult<()> {
        if self.failing.read().await.contains(slug) {
            return Err(StoreError::Injected(format!("dashboard {}", slug)));
        }
        Ok(())
    }
}

#[async_trait]
impl DashboardStore for InMemoryDashboardStore {
    async fn search(&self, tags: &[String]) -> StoreResult<Vec<RemoteDashboardRef>> {
        self.record(StoreCall::Search(tags.to_vec())).await;
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(StoreError::Injected("search".into()));
        }

        let dashboards = self.dashboards.read().await;
        Ok(dashboards
            .iter()
            .filter(|(_, d)| {
                let present = d.tags();
                tags.iter().all(|t| present.contains(&t.as_str()))
            })
            .map(|(slug, _)| RemoteDashboardRef::for_slug(slug))
            .collect())
    }

    async fn import(&self, dashboard: &DashboardDocument) -> StoreResult<()> {
        let slug = dashboard.slug()?;
        self.record(StoreCall::Import(slug.clone())).await;
        self.check_failing(&slug).await?;

        let mut dashboards = self.dashboards.write().await;
        if dashboards.contains_key(&slug) {
            return Err(StoreError::Api {
                status: 412,
                message: format!("dashboard {} already exists", slug),
            });
        }
        dashboards.insert(slug, dashboard.clone());
        Ok(())
    }

    async fn import_and_overwrite(&self, dashboard: &DashboardDocument) -> StoreResult<()> {
        let slug = dashboard.slug()?;
        self.record(StoreCall::ImportAndOverwrite(slug.clone())).await;
        self.check_failing(&slug).await?;

        self.dashboards.write().await.insert(slug, dashboard.clone());
        Ok(())
    }

    async fn delete(&self, slug: &Slug) -> StoreResult<()> {
        self.record(StoreCall::Delete(slug.clone())).await;
        self.check_failing(slug).await?;

        match self.dashboards.write().await.remove(slug) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("dashboard {}", slug))),
        }
    }
}
