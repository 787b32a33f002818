//! Plan application
//!
//! [`apply`] walks a plan and dispatches each action to an [`Effects`]
//! implementation. Two are provided: [`LiveEffects`] mutates the dashboard
//! store, [`DryRunEffects`] only logs.

use crate::error::ApplyError;
use crate::plan::{Action, Plan};
use async_trait::async_trait;
use dashsync_grafana::{DashboardDocument, DashboardStore, Slug, StoreResult};
use std::sync::Arc;

/// Side effects of the three action kinds
#[async_trait]
pub trait Effects: Send + Sync {
    async fn create(&self, dashboard: &DashboardDocument) -> StoreResult<()>;

    async fn update(&self, dashboard: &DashboardDocument) -> StoreResult<()>;

    async fn delete(&self, slug: &Slug) -> StoreResult<()>;
}

/// Effects that call the dashboard store
#[derive(Clone)]
pub struct LiveEffects {
    store: Arc<dyn DashboardStore>,
}

impl LiveEffects {
    pub fn new(store: Arc<dyn DashboardStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Effects for LiveEffects {
    async fn create(&self, dashboard: &DashboardDocument) -> StoreResult<()> {
        self.store.import(dashboard).await
    }

    /// Overwrite-import rather than delete-then-create, so the dashboard
    /// never disappears from the store.
    async fn update(&self, dashboard: &DashboardDocument) -> StoreResult<()> {
        self.store.import_and_overwrite(dashboard).await
    }

    async fn delete(&self, slug: &Slug) -> StoreResult<()> {
        self.store.delete(slug).await
    }
}

/// Effects that only log what would happen
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunEffects;

#[async_trait]
impl Effects for DryRunEffects {
    async fn create(&self, dashboard: &DashboardDocument) -> StoreResult<()> {
        tracing::info!(
            slug = %display_slug(dashboard),
            title = dashboard.title().unwrap_or_default(),
            "[dry-run] would create dashboard"
        );
        Ok(())
    }

    async fn update(&self, dashboard: &DashboardDocument) -> StoreResult<()> {
        tracing::info!(
            slug = %display_slug(dashboard),
            title = dashboard.title().unwrap_or_default(),
            "[dry-run] would update dashboard"
        );
        Ok(())
    }

    async fn delete(&self, slug: &Slug) -> StoreResult<()> {
        tracing::info!(slug = %slug, "[dry-run] would delete dashboard");
        Ok(())
    }
}

fn display_slug(dashboard: &DashboardDocument) -> String {
    dashboard
        .slug()
        .map(Slug::into_string)
        .unwrap_or_default()
}

/// Apply every action of `plan`, collecting failures.
///
/// A failing action never stops the remaining ones from being attempted.
pub async fn apply(plan: Plan, effects: &dyn Effects) -> Vec<ApplyError> {
    let mut errors = Vec::new();

    for action in plan {
        let kind = action.kind();
        let result = match &action {
            Action::Create { dashboard, .. } => effects.create(dashboard).await,
            Action::Update { dashboard, .. } => effects.update(dashboard).await,
            Action::Delete { slug } => effects.delete(slug).await,
        };

        match result {
            Ok(()) => tracing::debug!(action = %kind, slug = %action.slug(), "Applied action"),
            Err(source) => {
                let error = ApplyError {
                    kind,
                    slug: action.slug().clone(),
                    source,
                };
                tracing::error!(action = %kind, slug = %error.slug, error = %error.source, "Action failed");
                errors.push(error);
            }
        }
    }

    errors
}
