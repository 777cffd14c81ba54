//! Surface synchronization wire protocol.
//!
//! All traffic between the controller and the sandboxed drawing surface is
//! JSON envelopes with two shapes: Events (surface -> controller) and
//! Actions (controller -> surface). The channel may carry unrelated
//! messages, so protocol-produced envelopes carry an `origin` marker.

use serde::{Deserialize, Serialize};

/// Marker identifying envelopes produced by this protocol on a shared
/// channel. Receivers check it before interpreting a message.
pub const PROTOCOL_ORIGIN: &str = "drawbridge";

/// An event received from the drawing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SurfaceEvent {
    /// The surface finished booting and is ready for its starting scene.
    Init,

    /// The surface's in-memory scene changed. The payload is the scene as
    /// a JSON value; the controller renders it to text.
    DocumentChanged { payload: serde_json::Value },

    /// The surface asked the host to save the backing document.
    Save,

    /// The surface wants its content exported through a host save dialog.
    SaveDialogRequest {
        #[serde(default)]
        payload: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        opts: Option<DialogOptions>,
    },

    /// The surface asked the host to run its registered import command.
    RunCommand,

    /// Library content shuttled to a surface. Has no controller-side
    /// handler; it exists so the import flow can reuse the event envelope.
    ImportLibrary { payload: String },

    /// Any kind this build does not know. Ignored.
    #[serde(other)]
    Unknown,
}

/// An action sent to the drawing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SurfaceAction {
    /// Replace the surface's scene with the given serialized text.
    LoadScene {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<String>,
    },

    /// Ask the surface to serialize and return its scene.
    SaveScene {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<String>,
    },
}

/// Options attached to a `save-dialog-request` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogOptions {
    pub suggested_name: String,
}

impl DialogOptions {
    /// Canonical extension for the export: the suggested name's secondary
    /// dot-segment (`"scene.svg"` -> `"svg"`).
    pub fn canonical_extension(&self) -> Option<&str> {
        self.suggested_name.split('.').nth(1).filter(|s| !s.is_empty())
    }

    /// Binary image exports arrive as base64 data URLs; everything else is
    /// written as text.
    pub fn is_binary_image(&self) -> bool {
        self.canonical_extension() == Some("png")
    }
}

/// Inbound envelope: an event plus correlation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(flatten)]
    pub event: SurfaceEvent,

    /// Present when this event answers a correlated action.
    #[serde(
        rename = "correlationId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub correlation_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl EventEnvelope {
    pub fn new(event: SurfaceEvent) -> Self {
        Self {
            event,
            correlation_id: None,
            origin: None,
        }
    }

    /// Placeholder resolved immediately for actions that expect no reply.
    pub fn empty() -> Self {
        Self::new(SurfaceEvent::Unknown)
    }
}

/// Outbound envelope: an action, its correlation id when a reply is
/// expected, and the protocol origin marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    #[serde(flatten)]
    pub action: SurfaceAction,

    #[serde(
        rename = "correlationId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub correlation_id: Option<u64>,

    pub origin: String,
}

impl ActionEnvelope {
    pub fn new(action: SurfaceAction, correlation_id: Option<u64>) -> Self {
        Self {
            action,
            correlation_id,
            origin: PROTOCOL_ORIGIN.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_wire_shape() {
        let envelope = ActionEnvelope::new(
            SurfaceAction::LoadScene {
                payload: Some("{}".into()),
            },
            None,
        );
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["kind"], "load-scene");
        assert_eq!(value["payload"], "{}");
        assert_eq!(value["origin"], PROTOCOL_ORIGIN);
        assert!(value.get("correlationId").is_none());
    }

    #[test]
    fn test_action_carries_correlation_id() {
        let envelope = ActionEnvelope::new(SurfaceAction::SaveScene { payload: None }, Some(7));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["kind"], "save-scene");
        assert_eq!(value["correlationId"], 7);
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn test_event_round_trip() {
        let raw = json!({
            "kind": "document-changed",
            "payload": { "shapes": [1, 2, 3] },
        });
        let envelope: EventEnvelope = serde_json::from_value(raw).unwrap();
        assert_eq!(
            envelope.event,
            SurfaceEvent::DocumentChanged {
                payload: json!({ "shapes": [1, 2, 3] })
            }
        );
        assert_eq!(envelope.correlation_id, None);
    }

    #[test]
    fn test_save_dialog_opts_camel_case() {
        let raw = json!({
            "kind": "save-dialog-request",
            "payload": "<svg/>",
            "opts": { "suggestedName": "scene.svg" },
        });
        let envelope: EventEnvelope = serde_json::from_value(raw).unwrap();
        match envelope.event {
            SurfaceEvent::SaveDialogRequest { payload, opts } => {
                assert_eq!(payload, "<svg/>");
                assert_eq!(opts.unwrap().suggested_name, "scene.svg");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_save_dialog_without_opts_still_decodes() {
        let raw = json!({ "kind": "save-dialog-request", "payload": "x" });
        let envelope: EventEnvelope = serde_json::from_value(raw).unwrap();
        match envelope.event {
            SurfaceEvent::SaveDialogRequest { opts, .. } => assert!(opts.is_none()),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_kind_keeps_correlation_id() {
        let raw = json!({ "kind": "telemetry-ping", "correlationId": 12 });
        let envelope: EventEnvelope = serde_json::from_value(raw).unwrap();
        assert_eq!(envelope.event, SurfaceEvent::Unknown);
        assert_eq!(envelope.correlation_id, Some(12));
    }

    #[test]
    fn test_canonical_extension() {
        let opts = DialogOptions {
            suggested_name: "scene.png".into(),
        };
        assert_eq!(opts.canonical_extension(), Some("png"));
        assert!(opts.is_binary_image());

        let opts = DialogOptions {
            suggested_name: "library.sketchlib".into(),
        };
        assert_eq!(opts.canonical_extension(), Some("sketchlib"));
        assert!(!opts.is_binary_image());

        let opts = DialogOptions {
            suggested_name: "no-extension".into(),
        };
        assert_eq!(opts.canonical_extension(), None);
    }
}
