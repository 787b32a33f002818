//! Document source backed by a mounted ConfigMap directory
//!
//! Kubernetes projects every ConfigMap key as a file. The directory is
//! rescanned on an interval; a changed snapshot replaces the previous one
//! and wakes the reconciliation loop.

use async_trait::async_trait;
use dashsync_reconciler::{DocumentSource, SourceDocument, SourceError};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// [`DocumentSource`] over the files of one directory
pub struct DirectorySource {
    dir: PathBuf,
    poll_interval: Duration,
    snapshot: RwLock<Option<Vec<SourceDocument>>>,
    synced: AtomicBool,
    changes: broadcast::Sender<()>,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            dir: dir.into(),
            poll_interval,
            snapshot: RwLock::new(None),
            synced: AtomicBool::new(false),
            changes,
        }
    }

    /// Read every document currently in the directory, ordered by key.
    ///
    /// Dotfiles (including the `..data` links Kubernetes maintains) and
    /// anything that is not a regular file after following symlinks are
    /// skipped.
    pub async fn scan(&self) -> Result<Vec<SourceDocument>, SourceError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;
        let mut documents = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.dir, e))?
        {
            let key = entry.file_name().to_string_lossy().into_owned();
            if key.starts_with('.') {
                continue;
            }

            let path = entry.path();
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(&path, e)),
            };
            if !metadata.is_file() {
                continue;
            }

            match tokio::fs::read(&path).await {
                Ok(payload) => documents.push(SourceDocument::new(key, payload)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(&path, e)),
            }
        }

        documents.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(documents)
    }

    /// Rescan and swap in the new snapshot.
    ///
    /// Returns whether anything changed; a change notification is sent if so.
    /// On error the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<bool, SourceError> {
        let documents = self.scan().await?;

        let changed = {
            let mut snapshot = self.snapshot.write().await;
            if snapshot.as_ref() == Some(&documents) {
                false
            } else {
                tracing::debug!(
                    dir = %self.dir.display(),
                    documents = documents.len(),
                    "Configuration documents changed"
                );
                *snapshot = Some(documents);
                true
            }
        };

        if !self.synced.swap(true, Ordering::SeqCst) {
            tracing::info!(dir = %self.dir.display(), "Document source synced");
        }
        if changed {
            // No subscribers is fine
            let _ = self.changes.send(());
        }
        Ok(changed)
    }

    /// Rescan every poll interval until `shutdown` flips to `true`
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh().await {
                        tracing::error!(dir = %self.dir.display(), error = %e, "Failed to scan configuration documents");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(dir = %self.dir.display(), "Document poller stopped");
    }
}

fn io_error(path: &Path, source: io::Error) -> SourceError {
    SourceError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    async fn list_documents(&self) -> Result<Vec<SourceDocument>, SourceError> {
        self.snapshot
            .read()
            .await
            .clone()
            .ok_or(SourceError::NotSynced)
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<()>> {
        Some(self.changes.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn source(dir: &Path) -> DirectorySource {
        DirectorySource::new(dir, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_unsynced_until_first_scan() {
        let dir = tempfile::tempdir().unwrap();
        let source = source(dir.path());

        assert!(!source.has_synced());
        assert!(matches!(
            source.list_documents().await,
            Err(SourceError::NotSynced)
        ));

        assert!(source.refresh().await.unwrap());
        assert!(source.has_synced());
        assert!(source.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lists_regular_files_and_skips_dotfiles() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("node.json"), br#"{"dashboard": {"title": "Node"}}"#).unwrap();
        fs::write(dir.path().join("api.json"), b"{}").unwrap();
        fs::write(dir.path().join(".hidden"), b"{}").unwrap();
        fs::create_dir(dir.path().join("..data")).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let source = source(dir.path());
        source.refresh().await.unwrap();

        let documents = source.list_documents().await.unwrap();
        let keys: Vec<&str> = documents.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["api.json", "node.json"]);
        assert_eq!(documents[1].payload, br#"{"dashboard": {"title": "Node"}}"#.to_vec());
    }

    #[tokio::test]
    async fn test_notifies_only_on_change() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), b"{}").unwrap();
        let source = source(dir.path());
        let mut changes = source.subscribe().unwrap();

        assert!(source.refresh().await.unwrap());
        changes.recv().await.unwrap();

        assert!(!source.refresh().await.unwrap());
        assert!(changes.try_recv().is_err());

        fs::write(dir.path().join("a.json"), b"{\"changed\": true}").unwrap();
        assert!(source.refresh().await.unwrap());
        changes.recv().await.unwrap();

        fs::remove_file(dir.path().join("a.json")).unwrap();
        assert!(source.refresh().await.unwrap());
        assert!(source.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_error_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir(&docs).unwrap();
        fs::write(docs.join("a.json"), b"{}").unwrap();

        let source = source(&docs);
        source.refresh().await.unwrap();

        fs::remove_dir_all(&docs).unwrap();
        assert!(matches!(
            source.refresh().await,
            Err(SourceError::Io { .. })
        ));
        assert!(source.has_synced());
        assert_eq!(source.list_documents().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_directory_never_syncs() {
        let dir = tempfile::tempdir().unwrap();
        let source = source(&dir.path().join("missing"));

        assert!(source.refresh().await.is_err());
        assert!(!source.has_synced());
    }

    #[tokio::test]
    async fn test_poller_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let source = std::sync::Arc::new(source(dir.path()));
        let (tx, rx) = watch::channel(false);

        let poller = tokio::spawn({
            let source = source.clone();
            async move { source.run(rx).await }
        });

        while !source.has_synced() {
            tokio::task::yield_now().await;
        }
        tx.send(true).unwrap();
        poller.await.unwrap();
    }
}
