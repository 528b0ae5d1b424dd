//! Artifact file watcher for hot reload.
//!
//! Watch-mode supervisor: one `notify` watcher covers the four artifact
//! files, change events are forwarded into a channel, and a single task
//! owning the [`ConfigStore`] reference performs the reloads. Requests
//! only ever read store snapshots, so watcher activity never races them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::config::schema::ArtifactKind;
use crate::config::store::ConfigStore;

/// Supervises hot reload of the configuration artifacts.
pub struct ArtifactWatcher {
    store: Arc<ConfigStore>,
    update_tx: mpsc::UnboundedSender<ArtifactKind>,
    update_rx: mpsc::UnboundedReceiver<ArtifactKind>,
}

impl ArtifactWatcher {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        Self {
            store,
            update_tx,
            update_rx,
        }
    }

    /// Start watching and spawn the reload task.
    ///
    /// The task exits on shutdown, or when a settings reload turns watch
    /// mode off; dropping it tears the filesystem watcher down.
    pub fn spawn(
        mut self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<tokio::task::JoinHandle<()>, notify::Error> {
        let targets: Vec<(PathBuf, ArtifactKind)> = ArtifactKind::ALL
            .into_iter()
            .map(|kind| (kind.path(self.store.workdir()), kind))
            .collect();

        let tx = self.update_tx.clone();
        let event_targets = targets.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !event.kind.is_modify() && !event.kind.is_create() {
                        return;
                    }
                    for (path, kind) in &event_targets {
                        // Editors often replace files, so match by name
                        // rather than by the exact event path.
                        let name = path.file_name();
                        if event
                            .paths
                            .iter()
                            .any(|p| p == path || p.file_name() == name)
                        {
                            let _ = tx.send(*kind);
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        for (path, kind) in &targets {
            match watcher.watch(path, RecursiveMode::NonRecursive) {
                Ok(()) => tracing::info!(artifact = %kind, path = ?path, "Watching artifact"),
                Err(e) => {
                    tracing::warn!(artifact = %kind, path = ?path, error = %e, "Cannot watch artifact file")
                }
            }
        }

        let handle = tokio::spawn(async move {
            // The watcher lives as long as this task.
            let _watcher = watcher;
            loop {
                tokio::select! {
                    changed = self.update_rx.recv() => {
                        let Some(kind) = changed else { break };
                        tracing::info!(artifact = %kind, "Artifact change detected, reloading");
                        self.store.reload(kind);
                        if kind == ArtifactKind::Settings && !self.store.settings().watch {
                            tracing::info!("Watch mode disabled by settings reload; stopping watcher");
                            break;
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Artifact watcher received shutdown signal, exiting");
                        break;
                    }
                }
            }
        });

        Ok(handle)
    }
}
