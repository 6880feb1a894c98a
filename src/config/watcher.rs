//! Hot reload of the audit config file.
//!
//! The parent directory is watched rather than the file itself, so editors
//! that replace the file by rename keep triggering reloads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::audit::dispatcher::AuditDispatcher;
use crate::config::loader::load_config;
use crate::config::schema::AuditConfig;

/// Sends a validated `AuditConfig` each time the watched file changes.
pub struct ConfigWatcher {
    path: PathBuf,
    updates: mpsc::UnboundedSender<AuditConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AuditConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            updates,
        };
        (watcher, rx)
    }

    /// Start watching. Updates stop when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let path = self.path.clone();
        let updates = self.updates;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            reload_on_change(&path, res, &updates)
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Audit config watcher started");
        Ok(watcher)
    }
}

fn reload_on_change(
    path: &Path,
    res: notify::Result<Event>,
    updates: &mpsc::UnboundedSender<AuditConfig>,
) {
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Audit config watch error");
            return;
        }
    };
    if !(event.kind.is_modify() || event.kind.is_create()) {
        return;
    }
    if !event.paths.iter().any(|p| p.file_name() == path.file_name()) {
        return;
    }

    match load_config(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Audit config reloaded");
            if updates.send(config).is_err() {
                tracing::debug!("Audit config receiver dropped");
            }
        }
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Rejected audit config reload, keeping current configuration"
        ),
    }
}

/// Apply every received configuration to the dispatcher until the sender closes.
pub async fn watch_updates(
    dispatcher: Arc<AuditDispatcher>,
    mut updates: mpsc::UnboundedReceiver<AuditConfig>,
) {
    while let Some(config) = updates.recv().await {
        dispatcher.apply_config(&config);
    }
    tracing::debug!("Audit config update channel closed");
}
