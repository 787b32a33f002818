//! Daemon setup and lifecycle management

use crate::config::{DaemonConfig, SourceConfig, SourceKind};
use crate::configmaps::{configmap_api, kube_client, ConfigMapSource};
use crate::error::DaemonResult;
use crate::source::DirectorySource;
use dashsync_grafana::{GrafanaClient, StoreError};
use dashsync_reconciler::{DocumentSource, ReconciliationLoop};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::Api;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// The task feeding the document source
enum SourceTask {
    Directory(Arc<DirectorySource>),
    ConfigMaps(Arc<ConfigMapSource>, Api<ConfigMap>),
}

impl SourceTask {
    async fn build(config: &SourceConfig) -> DaemonResult<Self> {
        match config.kind {
            SourceKind::Directory => {
                tracing::info!(dir = %config.documents_dir.display(), "Reading documents from directory");
                Ok(Self::Directory(Arc::new(DirectorySource::new(
                    config.documents_dir.clone(),
                    config.poll_interval(),
                ))))
            }
            SourceKind::Kubernetes => {
                let client = kube_client(config.kubeconfig.as_deref()).await?;
                tracing::info!(
                    namespace = config.namespace.as_deref().unwrap_or("*"),
                    selector = config.selector.as_deref().unwrap_or(""),
                    "Watching ConfigMaps"
                );
                Ok(Self::ConfigMaps(
                    Arc::new(ConfigMapSource::new(config.selector.clone())),
                    configmap_api(client, config.namespace.as_deref()),
                ))
            }
        }
    }

    fn source(&self) -> Arc<dyn DocumentSource> {
        match self {
            Self::Directory(source) => source.clone(),
            Self::ConfigMaps(source, _) => source.clone(),
        }
    }

    async fn run(self, shutdown: watch::Receiver<bool>) {
        match self {
            Self::Directory(source) => source.run(shutdown).await,
            Self::ConfigMaps(source, api) => source.run(api, shutdown).await,
        }
    }
}

/// Dashsync daemon
pub struct Server {
    source: SourceTask,
    reconciler: ReconciliationLoop,
}

impl Server {
    /// Wire up the Grafana client, the document source and the loop
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.grafana.request_timeout())
            .build()
            .map_err(StoreError::from)?;
        let store = Arc::new(GrafanaClient::new(
            &config.grafana.url,
            config.grafana.auth()?,
            http,
        )?);

        let source = SourceTask::build(&config.source).await?;
        let reconciler = ReconciliationLoop::from_config(config.reconciler, source.source(), store);

        Ok(Self { source, reconciler })
    }

    /// Run until SIGINT or SIGTERM
    pub async fn run(self) -> DaemonResult<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `signal` resolves
    pub async fn run_until(self, signal: impl Future<Output = ()>) -> DaemonResult<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let source_task = tokio::spawn(self.source.run(shutdown_rx.clone()));

        let reconcile = self.reconciler.run(shutdown_rx);
        tokio::pin!(reconcile);

        let result = tokio::select! {
            result = &mut reconcile => result,
            _ = signal => {
                tracing::info!("Dashsync daemon shutting down");
                shutdown_tx.send_replace(true);
                reconcile.await
            }
        };

        // Stop the document source
        shutdown_tx.send_replace(true);
        if let Err(e) = source_task.await {
            tracing::error!(error = %e, "Document source task panicked");
        }

        result?;
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
