//! Host document model and change events.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use drawbridge_core::error::Result;
use drawbridge_sync::export;

/// A change observed on a host document.
#[derive(Debug, Clone)]
pub struct DocumentChange {
    pub document_id: String,
    /// Full document text after the change.
    pub text: String,
    /// Number of content deltas; zero means a metadata-only change.
    pub content_deltas: usize,
}

type ChangeHandler = Box<dyn Fn(&DocumentChange) + Send + Sync>;

/// Synchronous fan-out of document change events.
///
/// Handlers run inline on the emitting task, so a guard set around an edit
/// is still in effect when that edit's change event is delivered. Handlers
/// must not emit recursively.
#[derive(Default)]
pub struct DocumentEvents {
    handlers: Mutex<Vec<(u64, ChangeHandler)>>,
    next_id: AtomicU64,
}

impl DocumentEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; returns an id for [`DocumentEvents::unsubscribe`].
    pub fn subscribe(&self, handler: impl Fn(&DocumentChange) + Send + Sync + 'static) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Box::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(handler_id, _)| *handler_id != id);
    }

    pub fn emit(&self, change: &DocumentChange) {
        let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, handler) in handlers.iter() {
            handler(change);
        }
    }
}

/// One host-owned text document.
#[async_trait]
pub trait HostDocument: Send + Sync {
    fn id(&self) -> &str;

    async fn text(&self) -> String;

    /// Replace the entire document text. Emits a change event.
    async fn replace_all(&self, new_text: &str) -> Result<()>;

    async fn save(&self) -> Result<()>;
}

/// A document backed by a file on disk. Text lives in memory; `save`
/// persists it.
pub struct FileDocument {
    id: String,
    path: PathBuf,
    text: RwLock<String>,
    events: Arc<DocumentEvents>,
}

impl FileDocument {
    /// Open the backing file; a missing file starts empty.
    pub async fn open(path: impl Into<PathBuf>, events: Arc<DocumentEvents>) -> Result<Arc<Self>> {
        let path = path.into();
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            path,
            text: RwLock::new(text),
            events,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply an edit made outside the bridge (the host editor's own
    /// typing, or an external process touching the file).
    pub async fn set_text(&self, new_text: impl Into<String>) {
        let new_text = new_text.into();
        *self.text.write().await = new_text.clone();
        self.events.emit(&DocumentChange {
            document_id: self.id.clone(),
            text: new_text,
            content_deltas: 1,
        });
    }
}

#[async_trait]
impl HostDocument for FileDocument {
    fn id(&self) -> &str {
        &self.id
    }

    async fn text(&self) -> String {
        self.text.read().await.clone()
    }

    async fn replace_all(&self, new_text: &str) -> Result<()> {
        *self.text.write().await = new_text.to_string();
        self.events.emit(&DocumentChange {
            document_id: self.id.clone(),
            text: new_text.to_string(),
            content_deltas: 1,
        });
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        let text = self.text.read().await.clone();
        export::write_atomic(&self.path, text.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let events = Arc::new(DocumentEvents::new());
        let doc = FileDocument::open(dir.path().join("scene.sketch"), events)
            .await
            .unwrap();
        assert_eq!(doc.text().await, "");
    }

    #[tokio::test]
    async fn test_save_persists_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.sketch");
        let events = Arc::new(DocumentEvents::new());
        let doc = FileDocument::open(&path, events).await.unwrap();

        doc.replace_all("{\"v\": 1}").await.unwrap();
        doc.save().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"v\": 1}");
    }

    #[tokio::test]
    async fn test_change_events_fire_inline() {
        let dir = tempfile::tempdir().unwrap();
        let events = Arc::new(DocumentEvents::new());
        let doc = FileDocument::open(dir.path().join("d.sketch"), events.clone())
            .await
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        events.subscribe(move |change| {
            seen_clone
                .lock()
                .unwrap()
                .push((change.text.clone(), change.content_deltas));
        });

        doc.set_text("abc").await;
        doc.replace_all("def").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![("abc".to_string(), 1), ("def".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let events = DocumentEvents::new();
        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();
        let id = events.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let change = DocumentChange {
            document_id: "d".into(),
            text: String::new(),
            content_deltas: 1,
        };
        events.emit(&change);
        events.unsubscribe(id);
        events.emit(&change);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
