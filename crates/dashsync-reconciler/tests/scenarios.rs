//! End-to-end reconciliation scenarios against the in-memory store and source.

use dashsync_grafana::{
    DashboardDocument, InMemoryDashboardStore, RemoteDashboardRef, Slug, StoreCall, StoreError,
};
use dashsync_reconciler::{
    plan, Action, ActionKind, InMemoryDocumentSource, PlanCounts, ReconcilerConfig,
    ReconciliationLoop, SourceDocument,
};
use serde_json::json;
use std::sync::Arc;

const MARKER: &str = "managed";

fn declared(title: &str) -> DashboardDocument {
    DashboardDocument::from_value(json!({"dashboard": {"title": title}})).unwrap()
}

fn managed(title: &str) -> DashboardDocument {
    DashboardDocument::from_value(json!({"dashboard": {"title": title, "tags": [MARKER]}}))
        .unwrap()
}

fn remote(uri: &str) -> RemoteDashboardRef {
    RemoteDashboardRef::new(json!({ "uri": uri }))
}

fn reconciler(
    source: InMemoryDocumentSource,
    store: &InMemoryDashboardStore,
) -> ReconciliationLoop {
    ReconciliationLoop::from_config(
        ReconcilerConfig::with_marker_tag(MARKER),
        Arc::new(source),
        Arc::new(store.clone()),
    )
}

#[test]
fn scenario_create_missing_dashboard() {
    let p = plan(&[], vec![declared("dashboard-1")]);
    assert_eq!(p.len(), 1);
    assert!(matches!(
        &p.actions()[0],
        Action::Create { slug, .. } if slug.as_str() == "dashboard-1"
    ));
}

#[test]
fn scenario_update_existing_dashboard() {
    let p = plan(&[remote("db/dashboard-1")], vec![declared("dashboard-1")]);
    assert_eq!(p.len(), 1);
    assert!(matches!(
        &p.actions()[0],
        Action::Update { slug, .. } if slug.as_str() == "dashboard-1"
    ));
}

#[test]
fn scenario_delete_undeclared_dashboard() {
    let p = plan(&[remote("db/dashboard-1")], vec![]);
    assert_eq!(
        p.into_actions(),
        vec![Action::Delete {
            slug: Slug::new("dashboard-1")
        }]
    );
}

#[test]
fn accented_and_symbol_titles_match_their_remote_slugs() {
    let p = plan(
        &[remote("db/cafe-metrics"), remote("db/ops-and-infra")],
        vec![declared("Café Metrics"), declared("Ops & Infra")],
    );
    assert_eq!(p.counts(), PlanCounts { create: 0, update: 2, delete: 0 });
    let slugs: Vec<&str> = p.actions().iter().map(|a| a.slug().as_str()).collect();
    assert_eq!(slugs, vec!["cafe-metrics", "ops-and-infra"]);
}

#[test]
fn scenario_uri_less_ref_is_ignored() {
    let p = plan(&[RemoteDashboardRef::new(json!({}))], vec![]);
    assert!(p.is_empty());
}

#[tokio::test]
async fn scenario_failed_delete_is_replanned_next_cycle() {
    let store = InMemoryDashboardStore::new();
    let slug = store.insert(managed("dashboard-1")).await.unwrap();
    store.fail_on(slug.clone()).await;
    let reconciler = reconciler(InMemoryDocumentSource::synced_with([]).await, &store);

    let first = reconciler.reconcile_once().await.unwrap();
    assert_eq!(first.planned, PlanCounts { create: 0, update: 0, delete: 1 });
    assert_eq!(first.errors.len(), 1);
    assert_eq!(first.errors[0].kind, ActionKind::Delete);
    assert_eq!(first.errors[0].slug, slug);
    assert!(matches!(first.errors[0].source, StoreError::Injected(_)));

    let second = reconciler.reconcile_once().await.unwrap();
    assert_eq!(second.planned, first.planned);
    assert_eq!(second.errors.len(), 1);

    store.heal(&slug).await;
    let third = reconciler.reconcile_once().await.unwrap();
    assert!(third.is_success());
    assert!(store.slugs().await.is_empty());

    let deletes = store
        .calls()
        .await
        .into_iter()
        .filter(|c| *c == StoreCall::Delete(slug.clone()))
        .count();
    assert_eq!(deletes, 3);
}

#[tokio::test]
async fn unmanaged_dashboards_are_left_alone() {
    let store = InMemoryDashboardStore::new();
    store.insert(declared("hand-made")).await.unwrap();
    let source =
        InMemoryDocumentSource::synced_with([SourceDocument::new(
            "monitoring/node",
            r#"{"dashboard": {"title": "Node Exporter"}}"#,
        )])
        .await;
    let reconciler = reconciler(source, &store);

    let report = reconciler.reconcile_once().await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.planned, PlanCounts { create: 1, update: 0, delete: 0 });
    assert_eq!(
        store.slugs().await,
        vec![Slug::new("hand-made"), Slug::new("node-exporter")]
    );
    let stored = store.get(&Slug::new("node-exporter")).await.unwrap();
    assert_eq!(stored.tags(), vec![MARKER]);
}

#[tokio::test]
async fn declared_dashboards_converge_across_cycles() {
    let store = InMemoryDashboardStore::new();
    let source = InMemoryDocumentSource::synced_with([
        SourceDocument::new("default/a", r#"{"dashboard": {"title": "A"}}"#),
        SourceDocument::new("default/b", r#"{"dashboard": {"title": "B", "tags": ["team"]}}"#),
    ])
    .await;
    let reconciler = reconciler(source.clone(), &store);

    reconciler.reconcile_once().await.unwrap();
    store.clear_calls().await;

    source
        .upsert("default/b", r#"{"dashboard": {"title": "B", "tags": ["team"], "rev": 2}}"#)
        .await;
    source.remove("default/a").await;
    source
        .upsert("default/c", r#"{"dashboard": {"title": "C"}}"#)
        .await;

    let report = reconciler.reconcile_once().await.unwrap();
    assert!(report.is_success());
    assert_eq!(
        store.calls().await,
        vec![
            StoreCall::Search(vec![MARKER.to_string()]),
            StoreCall::Delete(Slug::new("a")),
            StoreCall::ImportAndOverwrite(Slug::new("b")),
            StoreCall::Import(Slug::new("c")),
        ]
    );

    let b = store.get(&Slug::new("b")).await.unwrap();
    assert_eq!(b.tags(), vec!["team", MARKER]);
    assert_eq!(b.as_value()["dashboard"]["rev"], json!(2));
}
