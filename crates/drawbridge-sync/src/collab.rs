//! Collaborator interfaces invoked by the controller's action handlers.
//!
//! The surface cannot touch the host's dialogs, commands, or files; those
//! capabilities are injected here as named traits instead of global
//! overrides.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use drawbridge_core::error::Result;

/// Executes a named, no-argument host-registered command.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<()>;
}

/// Presents a save dialog. `None` means the user cancelled.
#[async_trait]
pub trait SaveRequester: Send + Sync {
    async fn request_save(&self, suggested_name: &str) -> Result<Option<PathBuf>>;
}

/// Presents an open dialog filtered to one extension. `None` means the
/// user cancelled.
#[async_trait]
pub trait OpenRequester: Send + Sync {
    async fn request_open(&self, extension: &str) -> Result<Option<PathBuf>>;
}

/// Surfaces non-fatal, user-visible messages.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

/// Collaborator bundle injected into a controller.
#[derive(Clone)]
pub struct Collaborators {
    pub commands: Arc<dyn CommandRunner>,
    pub save_dialog: Arc<dyn SaveRequester>,
    pub notifier: Arc<dyn Notifier>,
}

/// Reports user-visible errors through the tracing pipeline.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}
