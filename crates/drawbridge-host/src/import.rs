//! Library import flow: open dialog, read, forward to the active surface.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use drawbridge_core::error::{BridgeError, Result};
use drawbridge_sync::collab::{CommandRunner, Notifier, OpenRequester};

use crate::registry::BindingRegistry;

/// Run the import flow once: pick a library file, read it, and hand its
/// content to the first live surface. Cancellation and a missing surface
/// are quiet no-ops; a read failure is reported to the user.
pub async fn run_import(
    registry: &BindingRegistry,
    opener: &dyn OpenRequester,
    notifier: &dyn Notifier,
    extension: &str,
) -> Result<()> {
    let Some(path) = opener.request_open(extension).await? else {
        return Ok(());
    };

    let data = match tokio::fs::read_to_string(&path).await {
        Ok(data) => data,
        Err(e) => {
            notifier.error(&e.to_string());
            return Ok(());
        }
    };

    let Some(binding) = registry.first().await else {
        debug!("no live surface to receive the library");
        return Ok(());
    };

    binding.instance().import_library(data);
    info!(path = %path.display(), "library forwarded to surface");
    Ok(())
}

/// The host-registered import command, triggered by `run-command` events.
pub struct ImportCommand {
    pub registry: Arc<BindingRegistry>,
    pub opener: Arc<dyn OpenRequester>,
    pub notifier: Arc<dyn Notifier>,
    pub command: String,
    pub extension: String,
}

#[async_trait]
impl CommandRunner for ImportCommand {
    async fn run(&self, command: &str) -> Result<()> {
        if command != self.command {
            return Err(BridgeError::Command(format!("unknown command: {command}")));
        }
        run_import(
            &self.registry,
            self.opener.as_ref(),
            self.notifier.as_ref(),
            &self.extension,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::EditorBinding;
    use crate::document::{DocumentEvents, FileDocument};
    use crate::pickers::StaticOpenRequester;
    use drawbridge_sync::channel::channel_pair;
    use drawbridge_sync::collab::{Collaborators, SaveRequester, TracingNotifier};
    use drawbridge_sync::instance::SyncInstance;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    struct NoopCommands;

    #[async_trait]
    impl CommandRunner for NoopCommands {
        async fn run(&self, _command: &str) -> Result<()> {
            Ok(())
        }
    }

    struct CancelledDialog;

    #[async_trait]
    impl SaveRequester for CancelledDialog {
        async fn request_save(&self, _suggested_name: &str) -> Result<Option<PathBuf>> {
            Ok(None)
        }
    }

    struct RecordingNotifier(Mutex<Vec<String>>);

    impl Notifier for RecordingNotifier {
        fn error(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    async fn live_registry() -> (Arc<BindingRegistry>, drawbridge_sync::channel::ChannelEndpoint)
    {
        let (controller_end, surface) = channel_pair();
        let collab = Collaborators {
            commands: Arc::new(NoopCommands),
            save_dialog: Arc::new(CancelledDialog),
            notifier: Arc::new(TracingNotifier),
        };
        let instance = SyncInstance::start(controller_end, collab, "drawbridge.import").unwrap();
        let events = Arc::new(DocumentEvents::new());
        let dir = tempfile::tempdir().unwrap();
        let document = FileDocument::open(dir.path().join("d.sketch"), events.clone())
            .await
            .unwrap();
        let binding = EditorBinding::bind(instance, document, events);

        let registry = Arc::new(BindingRegistry::new());
        registry.register(binding).await;
        (registry, surface)
    }

    #[tokio::test]
    async fn test_import_forwards_library_content() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("shapes.sketchlib");
        std::fs::write(&library, "{\"library\": [1]}").unwrap();

        let (registry, surface) = live_registry().await;
        let mut surface_rx = surface.take_inbound().unwrap();

        let opener = StaticOpenRequester::new(Some(library));
        let notifier = RecordingNotifier(Mutex::new(Vec::new()));
        run_import(&registry, &opener, &notifier, "sketchlib")
            .await
            .unwrap();

        let sent = tokio::time::timeout(Duration::from_secs(1), surface_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sent["kind"], "import-library");
        assert_eq!(sent["payload"], "{\"library\": [1]}");
        assert!(notifier.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_open_is_silent() {
        let (registry, surface) = live_registry().await;
        let mut surface_rx = surface.take_inbound().unwrap();

        let opener = StaticOpenRequester::new(None);
        let notifier = RecordingNotifier(Mutex::new(Vec::new()));
        run_import(&registry, &opener, &notifier, "sketchlib")
            .await
            .unwrap();

        let quiet = tokio::time::timeout(Duration::from_millis(100), surface_rx.recv()).await;
        assert!(quiet.is_err());
        assert!(notifier.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_library_is_reported() {
        let (registry, _surface) = live_registry().await;

        let opener =
            StaticOpenRequester::new(Some(PathBuf::from("/definitely/not/here.sketchlib")));
        let notifier = RecordingNotifier(Mutex::new(Vec::new()));
        run_import(&registry, &opener, &notifier, "sketchlib")
            .await
            .unwrap();

        assert_eq!(notifier.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_command_is_an_error() {
        let (registry, _surface) = live_registry().await;
        let command = ImportCommand {
            registry,
            opener: Arc::new(StaticOpenRequester::new(None)),
            notifier: Arc::new(TracingNotifier),
            command: "drawbridge.import".into(),
            extension: "sketchlib".into(),
        };
        assert!(command.run("drawbridge.other").await.is_err());
        assert!(command.run("drawbridge.import").await.is_ok());
    }
}
