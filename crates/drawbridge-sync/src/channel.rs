//! Abstract duplex message transport.

use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;

/// One end of a duplex channel carrying opaque JSON values.
///
/// Sends are fire-and-forget: there is no backpressure, and once the peer
/// is torn down messages are silently dropped. Delivery is FIFO per
/// direction; nothing is guaranteed across directions.
pub struct ChannelEndpoint {
    tx: mpsc::UnboundedSender<Value>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
}

impl ChannelEndpoint {
    pub fn from_parts(
        tx: mpsc::UnboundedSender<Value>,
        rx: mpsc::UnboundedReceiver<Value>,
    ) -> Self {
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Send a message to the peer. Dropped silently if the peer is gone.
    pub fn send(&self, message: Value) {
        let _ = self.tx.send(message);
    }

    /// Claim the inbound half. Each endpoint has exactly one consumer at a
    /// time; returns `None` when it is already claimed.
    pub fn take_inbound(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
        self.rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Hand the inbound half back, for transports that reconnect.
    pub fn restore_inbound(&self, rx: mpsc::UnboundedReceiver<Value>) {
        *self.rx.lock().unwrap_or_else(PoisonError::into_inner) = Some(rx);
    }
}

/// Build a connected in-process endpoint pair.
pub fn channel_pair() -> (ChannelEndpoint, ChannelEndpoint) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        ChannelEndpoint::from_parts(a_tx, a_rx),
        ChannelEndpoint::from_parts(b_tx, b_rx),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_pair_delivers_both_ways_in_order() {
        let (a, b) = channel_pair();
        let mut a_rx = a.take_inbound().unwrap();
        let mut b_rx = b.take_inbound().unwrap();

        a.send(json!({"n": 1}));
        a.send(json!({"n": 2}));
        b.send(json!("pong"));

        assert_eq!(b_rx.recv().await.unwrap(), json!({"n": 1}));
        assert_eq!(b_rx.recv().await.unwrap(), json!({"n": 2}));
        assert_eq!(a_rx.recv().await.unwrap(), json!("pong"));
    }

    #[tokio::test]
    async fn test_send_after_peer_teardown_is_silent() {
        let (a, b) = channel_pair();
        drop(b);
        a.send(json!("into the void"));
    }

    #[test]
    fn test_inbound_claimed_once() {
        let (a, _b) = channel_pair();
        let rx = a.take_inbound();
        assert!(rx.is_some());
        assert!(a.take_inbound().is_none());

        a.restore_inbound(rx.unwrap());
        assert!(a.take_inbound().is_some());
    }
}
