//! Binds one synchronization controller to one host document lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use drawbridge_sync::instance::{SyncInstance, SyncNotification};

use crate::document::{DocumentEvents, HostDocument};

/// Anti-feedback latch guard. Releases on drop, so the latch is false
/// again even when the edit path errors.
struct LatchGuard<'a>(&'a AtomicBool);

impl<'a> LatchGuard<'a> {
    fn hold(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Wires a controller to a host document: host edits flow to the surface,
/// surface changes flow back as document edits, and the latch keeps the
/// two from feeding on each other.
pub struct EditorBinding {
    instance: Arc<SyncInstance>,
    document: Arc<dyn HostDocument>,
    events: Arc<DocumentEvents>,
    doc_subscription: u64,
    notification_task: JoinHandle<()>,
}

impl EditorBinding {
    pub fn bind(
        instance: Arc<SyncInstance>,
        document: Arc<dyn HostDocument>,
        events: Arc<DocumentEvents>,
    ) -> Arc<Self> {
        let latch = Arc::new(AtomicBool::new(false));

        // Host edits -> surface. Handlers run inline on the editing task,
        // so edits made under the latch are filtered here before they can
        // loop back.
        let doc_subscription = {
            let instance = instance.clone();
            let latch = latch.clone();
            let document_id = document.id().to_string();
            events.subscribe(move |change| {
                if change.document_id != document_id
                    || latch.load(Ordering::SeqCst)
                    || change.content_deltas == 0
                {
                    return;
                }
                instance.load_data(change.text.clone());
            })
        };

        // Surface notifications -> host document.
        let notification_task = {
            let instance = instance.clone();
            let document = document.clone();
            let mut notifications = instance.subscribe();
            tokio::spawn(async move {
                let mut initialized = false;
                let mut first_change_seen = false;
                while let Some(notification) = notifications.recv().await {
                    match notification {
                        SyncNotification::Init => {
                            if initialized {
                                continue;
                            }
                            initialized = true;
                            let text = document.text().await;
                            instance.load_data(text);
                        }
                        SyncNotification::Changed { new_data, .. } => {
                            if !first_change_seen {
                                // the surface's initial load echo
                                first_change_seen = true;
                                continue;
                            }
                            if new_data == document.text().await {
                                continue;
                            }
                            let _latch = LatchGuard::hold(&latch);
                            if let Err(e) = document.replace_all(&new_data).await {
                                error!(%e, "failed to apply surface edit");
                            }
                        }
                        SyncNotification::Saved => {
                            if let Err(e) = document.save().await {
                                error!(%e, "document save failed");
                            }
                        }
                    }
                }
                debug!("notification stream ended");
            })
        };

        Arc::new(Self {
            instance,
            document,
            events,
            doc_subscription,
            notification_task,
        })
    }

    pub fn instance(&self) -> &Arc<SyncInstance> {
        &self.instance
    }

    pub fn document_id(&self) -> &str {
        self.document.id()
    }

    /// Release all subscriptions. Safe to call more than once.
    pub fn dispose(&self) {
        self.events.unsubscribe(self.doc_subscription);
        self.notification_task.abort();
        self.instance.dispose();
    }
}
