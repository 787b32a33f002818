//! Desired and actual state collection

use crate::error::SourceError;
use crate::source::{DocumentSource, SourceDocument};
use dashsync_grafana::{
    DashboardDocument, DashboardStore, DocumentError, RemoteDashboardRef, StoreResult,
};

/// Tags scoping the search for managed dashboards
fn marker_tags(marker_tag: &str) -> Vec<String> {
    if marker_tag.is_empty() {
        Vec::new()
    } else {
        vec![marker_tag.to_string()]
    }
}

/// Dashboards currently in the store that carry the marker tag.
///
/// Hits without a derivable slug are dropped with a warning.
pub async fn collect_actual(
    store: &dyn DashboardStore,
    marker_tag: &str,
) -> StoreResult<Vec<RemoteDashboardRef>> {
    let hits = store.search(&marker_tags(marker_tag)).await?;

    let managed: Vec<_> = hits
        .into_iter()
        .filter(|hit| match hit.slug() {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(uri = ?hit.uri(), error = %e, "Ignoring dashboard without a usable uri");
                false
            }
        })
        .collect();

    tracing::debug!(count = managed.len(), "Collected managed dashboards");
    Ok(managed)
}

/// Dashboards declared by the source's documents, stamped with the marker tag.
///
/// Documents that do not parse, have no usable title or cannot be tagged
/// are skipped with a warning naming the document.
pub async fn collect_desired(
    source: &dyn DocumentSource,
    marker_tag: &str,
) -> Result<Vec<DashboardDocument>, SourceError> {
    let documents = source.list_documents().await?;
    let mut desired = Vec::with_capacity(documents.len());

    for document in &documents {
        match to_dashboard(document, marker_tag) {
            Ok(dashboard) => desired.push(dashboard),
            Err(e) => tracing::warn!(
                key = %document.key,
                error = %e,
                "Could not make a dashboard out of configuration document"
            ),
        }
    }

    tracing::debug!(
        documents = documents.len(),
        dashboards = desired.len(),
        "Collected declared dashboards"
    );
    Ok(desired)
}

fn to_dashboard(document: &SourceDocument, marker_tag: &str) -> Result<DashboardDocument, DocumentError> {
    let mut dashboard = DashboardDocument::from_slice(&document.payload)?;
    dashboard.slug()?;
    if !marker_tag.is_empty() {
        dashboard.add_tag(marker_tag)?;
    }
    Ok(dashboard)
}
