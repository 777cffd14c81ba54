//! WebSocket leg of the message channel.
//!
//! Bridges one browser-hosted surface to the controller-side endpoint.
//! One live connection at a time; a reconnecting surface reclaims the
//! endpoint after the previous connection releases it.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use drawbridge_sync::channel::ChannelEndpoint;

/// Holds the surface-side channel endpoint between connections.
pub struct SurfaceBridge {
    endpoint: ChannelEndpoint,
}

impl SurfaceBridge {
    pub fn new(endpoint: ChannelEndpoint) -> Self {
        Self { endpoint }
    }
}

/// WebSocket upgrade handler for surface connections.
pub async fn channel_ws_handler(
    ws: WebSocketUpgrade,
    State(bridge): State<Arc<SurfaceBridge>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_surface_connection(bridge, socket))
}

async fn handle_surface_connection(bridge: Arc<SurfaceBridge>, mut ws: WebSocket) {
    let conn_id = Uuid::new_v4().to_string();

    let Some(mut outbound) = bridge.endpoint.take_inbound() else {
        warn!(conn_id = %conn_id, "rejecting surface connection, channel already attached");
        let _ = ws.send(Message::Close(None)).await;
        return;
    };
    info!(conn_id = %conn_id, "surface connected");

    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(message) => {
                    let Ok(text) = serde_json::to_string(&message) else {
                        continue;
                    };
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                // controller side torn down
                None => break,
            },
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<Value>(&text) {
                        Ok(value) => bridge.endpoint.send(value),
                        Err(e) => warn!(%e, "surface sent a non-JSON frame"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    error!(conn_id = %conn_id, %e, "surface socket error");
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    bridge.endpoint.restore_inbound(outbound);
    debug!(conn_id = %conn_id, "surface disconnected");
}
