//! Sandbox-side message relay.

use tokio::task::JoinHandle;

use drawbridge_core::error::{BridgeError, Result};

use crate::channel::ChannelEndpoint;

/// Forwards traffic between the inner sandboxed endpoint and the outer
/// channel. Content passes through unparsed and unmodified, one loop per
/// direction, so a message is never sent back where it came from.
pub struct Relay;

/// Handle for a running relay's forward loops.
pub struct RelayHandle {
    inner_to_outer: JoinHandle<()>,
    outer_to_inner: JoinHandle<()>,
}

impl RelayHandle {
    pub fn stop(&self) {
        self.inner_to_outer.abort();
        self.outer_to_inner.abort();
    }
}

impl Relay {
    /// Start forwarding between `inner` and `outer`. Each loop ends when
    /// its source side closes.
    pub fn spawn(inner: ChannelEndpoint, outer: ChannelEndpoint) -> Result<RelayHandle> {
        let mut inner_rx = inner
            .take_inbound()
            .ok_or_else(|| BridgeError::Channel("inner endpoint already claimed".into()))?;
        let mut outer_rx = outer
            .take_inbound()
            .ok_or_else(|| BridgeError::Channel("outer endpoint already claimed".into()))?;

        let inner_to_outer = tokio::spawn(async move {
            while let Some(message) = inner_rx.recv().await {
                outer.send(message);
            }
        });

        let outer_to_inner = tokio::spawn(async move {
            while let Some(message) = outer_rx.recv().await {
                inner.send(message);
            }
        });

        Ok(RelayHandle {
            inner_to_outer,
            outer_to_inner,
        })
    }
}
