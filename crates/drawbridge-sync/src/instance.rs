//! Synchronization controller for one surface/document pair.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use drawbridge_core::error::{BridgeError, Result};
use drawbridge_core::protocol::{
    ActionEnvelope, DialogOptions, EventEnvelope, SurfaceAction, SurfaceEvent, PROTOCOL_ORIGIN,
};

use crate::channel::ChannelEndpoint;
use crate::collab::Collaborators;
use crate::export;

/// Notifications emitted to subscribers. The controller only reports;
/// subscribers decide what to do with the host document.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncNotification {
    /// The surface finished booting.
    Init,
    /// The surface's scene changed. `old_data` is `None` when the previous
    /// snapshot was unknown (right after a load).
    Changed {
        new_data: String,
        old_data: Option<String>,
    },
    /// The surface requested a host-document save.
    Saved,
}

/// Controller-side protocol state.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncState {
    /// No `init` event has been seen yet.
    Uninitialized,
    /// The surface is live. `snapshot` is the last scene text the surface
    /// confirmed; `None` between a load request and the next
    /// `document-changed`.
    Ready { snapshot: Option<String> },
}

impl SyncState {
    fn clear_snapshot(&mut self) {
        if let SyncState::Ready { snapshot } = self {
            *snapshot = None;
        }
    }

    fn replace_snapshot(&mut self, new_data: String) -> Option<String> {
        match std::mem::replace(
            self,
            SyncState::Ready {
                snapshot: Some(new_data),
            },
        ) {
            SyncState::Ready { snapshot } => snapshot,
            SyncState::Uninitialized => None,
        }
    }
}

/// Handle for an action's eventual reply.
pub enum Reply {
    /// No reply was requested; resolves immediately with an empty event.
    Immediate,
    /// Resolves when an inbound event carries the matching correlation id.
    Pending(oneshot::Receiver<EventEnvelope>),
}

impl Reply {
    /// Wait for the reply. Returns `None` only when the controller itself
    /// has been dropped; a disposed controller leaves the reply pending
    /// indefinitely.
    pub async fn wait(self) -> Option<EventEnvelope> {
        match self {
            Reply::Immediate => Some(EventEnvelope::empty()),
            Reply::Pending(rx) => rx.await.ok(),
        }
    }
}

/// Owns the protocol state for one surface: the snapshot, the pending
/// request map, and the outbound channel. Inbound events are processed one
/// at a time, in arrival order, by the pump task.
pub struct SyncInstance {
    channel: ChannelEndpoint,
    state: Mutex<SyncState>,
    next_correlation: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<EventEnvelope>>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SyncNotification>>>,
    collab: Collaborators,
    import_command: String,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl SyncInstance {
    /// Attach a controller to `channel` and start its event pump.
    pub fn start(
        channel: ChannelEndpoint,
        collab: Collaborators,
        import_command: impl Into<String>,
    ) -> Result<Arc<Self>> {
        let mut inbound = channel
            .take_inbound()
            .ok_or_else(|| BridgeError::Channel("channel inbound already claimed".into()))?;

        let instance = Arc::new(Self {
            channel,
            state: Mutex::new(SyncState::Uninitialized),
            next_correlation: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
            collab,
            import_command: import_command.into(),
            pump: Mutex::new(None),
        });

        let pump = {
            let instance = instance.clone();
            tokio::spawn(async move {
                while let Some(message) = inbound.recv().await {
                    let envelope = match serde_json::from_value::<EventEnvelope>(message) {
                        Ok(envelope) => envelope,
                        Err(e) => {
                            debug!(%e, "ignoring undecodable channel message");
                            continue;
                        }
                    };
                    if let Err(e) = instance.handle_event(envelope).await {
                        error!(%e, "event handler failed");
                    }
                }
                debug!("channel closed, event pump stopped");
            })
        };
        *lock(&instance.pump) = Some(pump);

        Ok(instance)
    }

    /// Subscribe to controller notifications.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SyncNotification> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    /// Last scene text the surface confirmed, if known.
    pub fn snapshot(&self) -> Option<String> {
        match &*lock(&self.state) {
            SyncState::Ready { snapshot } => snapshot.clone(),
            SyncState::Uninitialized => None,
        }
    }

    pub fn state(&self) -> SyncState {
        lock(&self.state).clone()
    }

    /// Push a full scene into the surface. The snapshot is unknown until
    /// the surface answers with its next `document-changed`, so loads are
    /// never misread as confirmed content.
    pub fn load_data(&self, data: impl Into<String>) {
        lock(&self.state).clear_snapshot();
        let _ = self.send_action(
            SurfaceAction::LoadScene {
                payload: Some(data.into()),
            },
            false,
        );
    }

    /// Send an action to the surface. Correlation ids are strictly
    /// increasing and never reused; one is attached to the wire envelope
    /// only when a reply is expected.
    pub fn send_action(&self, action: SurfaceAction, expect_response: bool) -> Reply {
        let id = self.next_correlation.fetch_add(1, Ordering::SeqCst);

        let reply = if expect_response {
            let (tx, rx) = oneshot::channel();
            lock(&self.pending).insert(id, tx);
            Reply::Pending(rx)
        } else {
            Reply::Immediate
        };

        let envelope = ActionEnvelope::new(action, expect_response.then_some(id));
        match serde_json::to_value(&envelope) {
            Ok(value) => self.channel.send(value),
            Err(e) => error!(%e, "failed to serialize action"),
        }
        reply
    }

    /// Forward library content to the surface (the import flow's last hop).
    pub fn import_library(&self, data: impl Into<String>) {
        let envelope = EventEnvelope {
            event: SurfaceEvent::ImportLibrary {
                payload: data.into(),
            },
            correlation_id: None,
            origin: Some(PROTOCOL_ORIGIN.to_string()),
        };
        match serde_json::to_value(&envelope) {
            Ok(value) => self.channel.send(value),
            Err(e) => error!(%e, "failed to serialize library payload"),
        }
    }

    /// Stop the event pump and drop all subscriptions. Outstanding replies
    /// stay parked in the pending map and never resolve.
    pub fn dispose(&self) {
        if let Some(pump) = lock(&self.pump).take() {
            pump.abort();
        }
        lock(&self.subscribers).clear();
    }

    fn notify(&self, notification: SyncNotification) {
        lock(&self.subscribers).retain(|tx| tx.send(notification.clone()).is_ok());
    }

    async fn handle_event(&self, envelope: EventEnvelope) -> Result<()> {
        match &envelope.event {
            SurfaceEvent::Init => {
                let mut state = lock(&self.state);
                if matches!(*state, SyncState::Uninitialized) {
                    *state = SyncState::Ready { snapshot: None };
                }
                drop(state);
                self.notify(SyncNotification::Init);
            }
            SurfaceEvent::DocumentChanged { payload } => {
                let new_data = serde_json::to_string_pretty(payload)?;
                let old_data = lock(&self.state).replace_snapshot(new_data.clone());
                self.notify(SyncNotification::Changed { new_data, old_data });
            }
            SurfaceEvent::RunCommand => {
                self.collab.commands.run(&self.import_command).await?;
            }
            SurfaceEvent::SaveDialogRequest { payload, opts } => {
                self.handle_save_dialog(payload, opts.as_ref()).await?;
            }
            SurfaceEvent::Save => self.notify(SyncNotification::Saved),
            SurfaceEvent::ImportLibrary { .. } => {
                debug!("import-library event has no controller-side handler");
            }
            SurfaceEvent::Unknown => debug!("ignoring unrecognized event kind"),
        }

        if let Some(id) = envelope.correlation_id {
            match lock(&self.pending).remove(&id) {
                Some(tx) => {
                    let _ = tx.send(envelope);
                }
                None => debug!(correlation_id = id, "no pending request for reply"),
            }
        }

        Ok(())
    }

    async fn handle_save_dialog(&self, payload: &str, opts: Option<&DialogOptions>) -> Result<()> {
        let Some(opts) = opts else {
            self.collab.notifier.error("File options are missing");
            return Ok(());
        };

        let Some(chosen) = self
            .collab
            .save_dialog
            .request_save(&opts.suggested_name)
            .await?
        else {
            // user cancelled the dialog
            return Ok(());
        };

        let target = export::resolve_export_path(chosen, opts.canonical_extension());
        if opts.is_binary_image() {
            let bytes = export::decode_data_url(payload)?;
            export::write_atomic(&target, &bytes).await?;
        } else {
            export::write_atomic(&target, payload.as_bytes()).await?;
        }
        debug!(path = %target.display(), "surface export written");
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
