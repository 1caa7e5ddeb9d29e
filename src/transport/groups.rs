//! Multicast delivery over per-connection outbound channels
//!
//! The hub owns one outbound frame channel per live connection and delivers
//! a single event to a named recipient, a computed recipient set, or every
//! connection at once. Recipient sets for room-scoped events are computed
//! by the broadcaster from the presence directory; the hub is delivery only.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;

use crate::protocol::frame::Frame;
use crate::protocol::messages::ConnId;

/// Multicast hub tracking every connected session's outbound channel
#[derive(Debug, Default)]
pub struct MulticastHub {
    /// Outbound frame senders indexed by connection ID
    conns: RwLock<HashMap<ConnId, mpsc::UnboundedSender<Frame>>>,
}

impl MulticastHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self {
            conns: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection and return the receiving end of its outbound
    /// channel. Replaces any prior registration for the same connection ID.
    pub async fn register(&self, conn_id: &str) -> mpsc::UnboundedReceiver<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut conns = self.conns.write().await;
        if conns.insert(conn_id.to_string(), tx).is_some() {
            debug!("Replaced outbound channel for connection {}", conn_id);
        }
        rx
    }

    /// Remove a connection's outbound channel. Safe to call more than once.
    pub async fn unregister(&self, conn_id: &str) {
        self.conns.write().await.remove(conn_id);
    }

    /// Deliver a frame to a single connection. Returns false if the
    /// connection is not registered or its receiver is gone.
    pub async fn send(&self, conn_id: &str, frame: Frame) -> bool {
        let conns = self.conns.read().await;
        match conns.get(conn_id) {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        }
    }

    /// Deliver a frame to each connection in the recipient set, optionally
    /// excluding one. The set is resolved against live connections under a
    /// single lock acquisition.
    pub async fn multicast(&self, recipients: &[ConnId], frame: Frame, exclude: Option<&str>) {
        let conns = self.conns.read().await;
        for conn_id in recipients {
            if Some(conn_id.as_str()) == exclude {
                continue;
            }
            if let Some(tx) = conns.get(conn_id) {
                let _ = tx.send(frame.clone());
            }
        }
    }

    /// Deliver a frame to every connected session regardless of room
    pub async fn broadcast(&self, frame: Frame) {
        let conns = self.conns.read().await;
        for tx in conns.values() {
            let _ = tx.send(frame.clone());
        }
    }

    /// Number of live connections
    pub async fn connection_count(&self) -> usize {
        self.conns.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::FrameType;

    fn frame(tag: &str) -> Frame {
        Frame::new(FrameType::ChatMessage, tag.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_register_and_send() {
        let hub = MulticastHub::new();
        let mut rx = hub.register("c1").await;

        assert!(hub.send("c1", frame("hi")).await);
        let got = rx.recv().await.unwrap();
        assert_eq!(got.payload.as_ref(), b"hi");

        assert!(!hub.send("missing", frame("hi")).await);
    }

    #[tokio::test]
    async fn test_multicast_with_exclusion() {
        let hub = MulticastHub::new();
        let mut rx1 = hub.register("c1").await;
        let mut rx2 = hub.register("c2").await;

        let recipients = vec!["c1".to_string(), "c2".to_string()];
        hub.multicast(&recipients, frame("event"), Some("c1")).await;

        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all() {
        let hub = MulticastHub::new();
        let mut rx1 = hub.register("c1").await;
        let mut rx2 = hub.register("c2").await;
        let mut rx3 = hub.register("c3").await;

        hub.broadcast(frame("all")).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let hub = MulticastHub::new();
        let _rx = hub.register("c1").await;
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister("c1").await;
        assert_eq!(hub.connection_count().await, 0);
        assert!(!hub.send("c1", frame("late")).await);

        // Unregister twice is a no-op
        hub.unregister("c1").await;
    }
}
