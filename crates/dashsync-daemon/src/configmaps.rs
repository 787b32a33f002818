//! Document source backed by a ConfigMap watch
//!
//! A reflector mirrors the ConfigMaps matching the namespace and label
//! selector. Every ConfigMap contributes the value of its first data key,
//! keyed by `namespace/name`.

use crate::error::{DaemonError, DaemonResult};
use async_trait::async_trait;
use dashsync_reconciler::{DocumentSource, SourceDocument, SourceError};
use futures_util::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::reflector::{self, store::Writer, Store};
use kube::runtime::watcher::{self, watcher, Event};
use kube::runtime::WatchStreamExt;
use kube::{Api, Client, ResourceExt};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, watch, Mutex};

/// [`DocumentSource`] over the ConfigMaps of a cluster
pub struct ConfigMapSource {
    label_selector: Option<String>,
    reader: Store<ConfigMap>,
    writer: Mutex<Writer<ConfigMap>>,
    synced: AtomicBool,
    changes: broadcast::Sender<()>,
}

impl ConfigMapSource {
    pub fn new(label_selector: Option<String>) -> Self {
        let (reader, writer) = reflector::store();
        let (changes, _) = broadcast::channel(16);
        Self {
            label_selector,
            reader,
            writer: Mutex::new(writer),
            synced: AtomicBool::new(false),
            changes,
        }
    }

    /// Fold one watch event into the mirrored state.
    ///
    /// The first full listing marks the source synced; from then on every
    /// event wakes the reconciliation loop.
    pub async fn apply(&self, event: Event<ConfigMap>) {
        self.writer.lock().await.apply_watcher_event(&event);

        if let Event::Restarted(ref listed) = event {
            if !self.synced.swap(true, Ordering::SeqCst) {
                tracing::info!(configmaps = listed.len(), "Document source synced");
            }
        }
        if self.has_synced() {
            // No subscribers is fine
            let _ = self.changes.send(());
        }
    }

    /// Watch `api` until `shutdown` flips to `true`.
    ///
    /// Watch failures are retried with backoff; the mirrored state is kept
    /// in the meantime.
    pub async fn run(&self, api: Api<ConfigMap>, mut shutdown: watch::Receiver<bool>) {
        let stream = watcher(api, self.watcher_config()).default_backoff();
        tokio::pin!(stream);

        loop {
            tokio::select! {
                event = stream.next() => match event {
                    Some(Ok(event)) => self.apply(event).await,
                    Some(Err(e)) => tracing::warn!(error = %e, "ConfigMap watch failed, retrying"),
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("ConfigMap watch stopped");
    }

    fn watcher_config(&self) -> watcher::Config {
        match &self.label_selector {
            Some(selector) => watcher::Config::default().labels(selector),
            None => watcher::Config::default(),
        }
    }
}

/// The document a ConfigMap declares, if it has any data
fn to_document(configmap: &ConfigMap) -> Option<SourceDocument> {
    let key = format!(
        "{}/{}",
        configmap.namespace().unwrap_or_default(),
        configmap.name_any()
    );
    match configmap.data.as_ref().and_then(|data| data.values().next()) {
        Some(payload) => Some(SourceDocument::new(key, payload.clone())),
        None => {
            tracing::warn!(configmap = %key, "ConfigMap has no data, skipping");
            None
        }
    }
}

#[async_trait]
impl DocumentSource for ConfigMapSource {
    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    async fn list_documents(&self) -> Result<Vec<SourceDocument>, SourceError> {
        if !self.has_synced() {
            return Err(SourceError::NotSynced);
        }
        let mut documents: Vec<SourceDocument> = self
            .reader
            .state()
            .iter()
            .filter_map(|configmap| to_document(configmap))
            .collect();
        documents.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(documents)
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<()>> {
        Some(self.changes.subscribe())
    }
}

/// ConfigMap API scoped to `namespace`, or to the whole cluster
pub fn configmap_api(client: Client, namespace: Option<&str>) -> Api<ConfigMap> {
    match namespace {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    }
}

/// Connect using `kubeconfig`, or the inferred configuration (local
/// kubeconfig, then in-cluster service account) when none is given
pub async fn kube_client(kubeconfig: Option<&Path>) -> DaemonResult<Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                DaemonError::Config(format!("failed to read kubeconfig {}: {}", path.display(), e))
            })?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| DaemonError::Config(format!("invalid kubeconfig: {}", e)))?
        }
        None => kube::Config::infer()
            .await
            .map_err(|e| DaemonError::Config(format!("no Kubernetes configuration found: {}", e)))?,
    };
    Ok(Client::try_from(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn configmap(namespace: &str, name: &str, data: &[(&str, &str)]) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some(namespace.into()),
                ..Default::default()
            },
            data: (!data.is_empty()).then(|| {
                data.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unsynced_until_initial_listing() {
        let source = ConfigMapSource::new(None);
        source
            .apply(Event::Applied(configmap("default", "early", &[("a.json", "{}")])))
            .await;

        assert!(!source.has_synced());
        assert!(matches!(
            source.list_documents().await,
            Err(SourceError::NotSynced)
        ));

        source.apply(Event::Restarted(vec![])).await;
        assert!(source.has_synced());
        assert!(source.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_data_key_keyed_by_namespace_and_name() {
        let source = ConfigMapSource::new(Some("dashboards=true".into()));
        source
            .apply(Event::Restarted(vec![
                configmap("monitoring", "node", &[("b.json", "second"), ("a.json", "first")]),
                configmap("default", "api", &[("api.json", "{}")]),
                configmap("default", "empty", &[]),
            ]))
            .await;

        let documents = source.list_documents().await.unwrap();
        let keys: Vec<&str> = documents.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["default/api", "monitoring/node"]);
        assert_eq!(documents[1].payload, b"first".to_vec());
    }

    #[tokio::test]
    async fn test_watch_events_update_listing_and_notify() {
        let source = ConfigMapSource::new(None);
        let mut changes = source.subscribe().unwrap();

        source
            .apply(Event::Restarted(vec![configmap("default", "a", &[("a.json", "{}")])]))
            .await;
        changes.recv().await.unwrap();

        source
            .apply(Event::Applied(configmap("default", "b", &[("b.json", "{}")])))
            .await;
        changes.recv().await.unwrap();
        assert_eq!(source.list_documents().await.unwrap().len(), 2);

        source
            .apply(Event::Deleted(configmap("default", "a", &[("a.json", "{}")])))
            .await;
        changes.recv().await.unwrap();

        let documents = source.list_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].key, "default/b");
    }

    #[test]
    fn test_watcher_config_carries_selector() {
        let source = ConfigMapSource::new(Some("app=grafana".into()));
        assert_eq!(
            source.watcher_config().label_selector.as_deref(),
            Some("app=grafana")
        );
        assert!(ConfigMapSource::new(None)
            .watcher_config()
            .label_selector
            .is_none());
    }
}
