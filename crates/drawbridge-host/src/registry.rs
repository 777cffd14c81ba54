//! Registry of live (controller, document) bindings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::binding::EditorBinding;

/// A registered live binding.
#[derive(Clone)]
pub struct RegistryEntry {
    pub binding: Arc<EditorBinding>,
    pub opened_at: DateTime<Utc>,
}

/// Tracks the bindings of all open document views. The import flow targets
/// the first live entry.
#[derive(Default)]
pub struct BindingRegistry {
    entries: RwLock<Vec<RegistryEntry>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, binding: Arc<EditorBinding>) {
        self.entries.write().await.push(RegistryEntry {
            binding,
            opened_at: Utc::now(),
        });
    }

    /// Dispose and deregister every binding for `document_id`.
    pub async fn close(&self, document_id: &str) {
        let mut entries = self.entries.write().await;
        entries.retain(|entry| {
            if entry.binding.document_id() == document_id {
                entry.binding.dispose();
                false
            } else {
                true
            }
        });
    }

    pub async fn first(&self) -> Option<Arc<EditorBinding>> {
        self.entries
            .read()
            .await
            .first()
            .map(|entry| entry.binding.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
