//! External-edit detection for file-backed documents.
//!
//! Watches the document's backing file and folds outside modifications
//! back into the in-memory document, which re-emits them as ordinary
//! change events. Saves made through the document write the same content
//! the document already holds, so they fall out of the equality check and
//! never loop.

use std::ffi::OsString;
use std::sync::Arc;

use notify::{EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::document::{FileDocument, HostDocument};

/// Watches one document's backing file.
pub struct DocumentWatcher {
    _watcher: notify::RecommendedWatcher,
}

impl DocumentWatcher {
    pub fn start(document: Arc<FileDocument>) -> anyhow::Result<Self> {
        let path = document.path().to_path_buf();
        let file_name: OsString = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("document path has no file name"))?
            .to_os_string();

        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                            && event
                                .paths
                                .iter()
                                .any(|p| p.file_name() == Some(file_name.as_os_str()))
                        {
                            let _ = tx.send(());
                        }
                    }
                    Err(e) => {
                        error!(%e, "document file watch error");
                    }
                }
            })?;

        // Watch the parent directory to catch renames/recreates.
        let watch_target = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| std::path::PathBuf::from("."));
        watcher.watch(&watch_target, RecursiveMode::NonRecursive)?;
        info!(path = %path.display(), "document file watcher started");

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                match tokio::fs::read_to_string(&path).await {
                    Ok(text) => {
                        if text != document.text().await {
                            debug!("external edit detected, reloading document");
                            document.set_text(text).await;
                        }
                    }
                    Err(e) => debug!(%e, "could not re-read document"),
                }
            }
        });

        Ok(Self { _watcher: watcher })
    }
}
