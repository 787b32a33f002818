//! The daemon end to end: mounted documents in, Grafana API calls out.

use dashsync_daemon::{DaemonConfig, DaemonError, Server, SourceKind};
use serde_json::json;
use std::fs;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(grafana: &MockServer, documents_dir: &std::path::Path) -> DaemonConfig {
    let mut config = DaemonConfig::default();
    config.grafana.url = grafana.uri();
    config.grafana.api_key = Some("secret-key".into());
    config.source.kind = SourceKind::Directory;
    config.source.documents_dir = documents_dir.to_path_buf();
    config.source.poll_interval_secs = 1;
    config.reconciler.marker_tag = "managed".into();
    config
}

#[tokio::test]
async fn test_daemon_converges_grafana_on_mounted_documents() {
    let grafana = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("tag", "managed"))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "uri": "db/stale", "title": "Stale" }
        ])))
        .expect(1)
        .mount(&grafana)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dashboards/import"))
        .and(body_partial_json(json!({
            "overwrite": false,
            "dashboard": { "title": "Node Exporter", "tags": ["managed"] }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&grafana)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/dashboards/db/stale"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&grafana)
        .await;

    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("node-exporter.json"),
        br#"{"dashboard": {"title": "Node Exporter"}}"#,
    )
    .unwrap();
    fs::write(dir.path().join(".ignored"), b"not a dashboard").unwrap();

    let server = Server::new(config(&grafana, dir.path())).await.unwrap();
    server
        .run_until(tokio::time::sleep(Duration::from_millis(800)))
        .await
        .unwrap();

    grafana.verify().await;
}

#[tokio::test]
async fn test_dry_run_only_searches() {
    let grafana = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "uri": "db/stale", "title": "Stale" }
        ])))
        .expect(1)
        .mount(&grafana)
        .await;

    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("a.json"),
        br#"{"dashboard": {"title": "A"}}"#,
    )
    .unwrap();

    let mut config = config(&grafana, dir.path());
    config.reconciler.dry_run = true;
    Server::new(config)
        .await
        .unwrap()
        .run_until(tokio::time::sleep(Duration::from_millis(800)))
        .await
        .unwrap();

    let received = grafana.received_requests().await.unwrap();
    assert!(received.iter().all(|r| r.method.as_str() == "GET"));
}

#[tokio::test]
async fn test_missing_documents_dir_never_reconciles() {
    let grafana = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let mut config = config(&grafana, &dir.path().join("missing"));
    config.reconciler.sync_timeout_secs = Some(1);
    let result = Server::new(config)
        .await
        .unwrap()
        .run_until(std::future::pending())
        .await;

    assert!(matches!(result, Err(DaemonError::Reconcile(e)) if e.is_startup()));
    assert!(grafana.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_config_is_rejected_at_startup() {
    let result = Server::new(DaemonConfig::default()).await;
    assert!(matches!(result, Err(DaemonError::Config(_))));
}

#[tokio::test]
async fn test_unreadable_kubeconfig_is_a_config_error() {
    let grafana = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let mut config = config(&grafana, dir.path());
    config.source.kind = SourceKind::Kubernetes;
    config.source.kubeconfig = Some(dir.path().join("missing-kubeconfig"));

    let result = Server::new(config).await;
    assert!(matches!(result, Err(DaemonError::Config(_))));
}
