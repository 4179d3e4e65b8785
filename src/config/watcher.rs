//! Section directory watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{is_section_file, load_section_file, RawSection};
use crate::config::store::Store;

/// Watches a directory of section files and forwards every changed section.
pub struct SectionWatcher {
    dir: PathBuf,
    update_tx: mpsc::UnboundedSender<RawSection>,
}

impl SectionWatcher {
    /// Create a new SectionWatcher.
    ///
    /// Returns the watcher and a receiver for raw section updates.
    pub fn new(dir: &Path) -> (Self, mpsc::UnboundedReceiver<RawSection>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                dir: dir.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the directory in a background thread.
    ///
    /// The returned watcher must be kept alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    for path in event.paths.iter().filter(|p| is_section_file(p)) {
                        tracing::info!(path = ?path, "Section file change detected, reloading...");
                        match load_section_file(path) {
                            Ok(section) => {
                                let _ = tx.send(section);
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload section: {}. Keeping current configuration.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        tracing::info!(dir = ?self.dir, "Section watcher started");
        Ok(watcher)
    }
}

/// Apply every received section to the store until the channel closes.
///
/// `on_applied` runs after each section that the store accepted.
pub async fn apply_updates<F>(store: Arc<Store>, mut updates: mpsc::UnboundedReceiver<RawSection>, mut on_applied: F)
where
    F: FnMut(&Store),
{
    while let Some(section) = updates.recv().await {
        // Rejections are logged by the store; the previous value stays live.
        if store.on_source_changed(&section).is_ok() {
            on_applied(&store);
        }
    }
    tracing::debug!("Section update channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::kourier::KOURIER_CONFIG_NAME;
    use crate::config::network::NETWORK_CONFIG_NAME;

    #[tokio::test]
    async fn test_apply_updates_feeds_store() {
        let store = Arc::new(Store::new());
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(RawSection::new(KOURIER_CONFIG_NAME).with("trusted-hops-count", "2"))
            .unwrap();
        tx.send(RawSection::new(KOURIER_CONFIG_NAME).with("trusted-hops-count", "bad"))
            .unwrap();
        tx.send(RawSection::new(NETWORK_CONFIG_NAME).with("system-internal-tls", "enabled"))
            .unwrap();
        drop(tx);

        let mut applied = 0;
        apply_updates(Arc::clone(&store), rx, |_| applied += 1).await;

        assert_eq!(applied, 2);
        let config = store.load();
        assert_eq!(config.kourier.trusted_hops_count, 2);
        assert!(config.network.system_internal_tls_enabled());
    }

    #[tokio::test]
    async fn test_watcher_starts_on_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, _rx) = SectionWatcher::new(dir.path());
        assert!(watcher.run().is_ok());
    }

    #[test]
    fn test_watcher_fails_on_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let (watcher, _rx) = SectionWatcher::new(&missing);
        assert!(watcher.run().is_err());
    }
}
