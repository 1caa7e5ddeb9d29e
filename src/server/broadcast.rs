//! Room-scoped fan-out for the chat relay
//!
//! The broadcaster turns a directory-derived recipient set into multicast
//! deliveries. Membership is re-queried from the presence directory on
//! every call, never cached, so rapid join/leave sequences are always
//! reflected in who receives an event.

use std::sync::Arc;

use crate::error::{RelayError, Result};
use crate::protocol::codec::Encodable;
use crate::protocol::frame::Frame;
use crate::protocol::messages::{ConnId, RoomList, UserEntry, UserList};
use crate::server::presence::PresenceDirectory;
use crate::transport::groups::MulticastHub;

/// Fan-out façade over the multicast hub
#[derive(Clone)]
pub struct RoomBroadcaster {
    directory: Arc<PresenceDirectory>,
    hub: Arc<MulticastHub>,
}

impl RoomBroadcaster {
    /// Create a broadcaster over the given directory and hub
    pub fn new(directory: Arc<PresenceDirectory>, hub: Arc<MulticastHub>) -> Self {
        Self { directory, hub }
    }

    /// Deliver an event to every member of a room, sender included
    pub async fn to_room<T: Encodable>(&self, room: &str, msg: &T) -> Result<()> {
        let frame = encode_frame(msg)?;
        let recipients = self.recipients_of(room).await;
        self.hub.multicast(&recipients, frame, None).await;
        Ok(())
    }

    /// Deliver an event to every member of a room except the sender
    pub async fn to_room_except_sender<T: Encodable>(
        &self,
        room: &str,
        msg: &T,
        sender_id: &str,
    ) -> Result<()> {
        let frame = encode_frame(msg)?;
        let recipients = self.recipients_of(room).await;
        self.hub.multicast(&recipients, frame, Some(sender_id)).await;
        Ok(())
    }

    /// Deliver an event to every connected session regardless of room
    pub async fn to_all<T: Encodable>(&self, msg: &T) -> Result<()> {
        let frame = encode_frame(msg)?;
        self.hub.broadcast(frame).await;
        Ok(())
    }

    /// Deliver an event privately to one connection
    pub async fn to_connection<T: Encodable>(&self, conn_id: &str, msg: &T) -> Result<()> {
        let frame = encode_frame(msg)?;
        self.hub.send(conn_id, frame).await;
        Ok(())
    }

    /// Build the member list for a room from a fresh directory snapshot
    pub async fn roster(&self, room: &str) -> UserList {
        let users = self
            .directory
            .members_of(room)
            .await
            .into_iter()
            .map(|s| UserEntry {
                name: s.name,
                room: s.room,
            })
            .collect();
        UserList { users }
    }

    /// Build the global room list from a fresh directory snapshot
    pub async fn room_index(&self) -> RoomList {
        RoomList {
            rooms: self.directory.active_rooms().await,
        }
    }

    /// Recipient connection IDs for a room, computed at call time under a
    /// single directory snapshot
    async fn recipients_of(&self, room: &str) -> Vec<ConnId> {
        self.directory
            .members_of(room)
            .await
            .into_iter()
            .map(|s| s.conn_id)
            .collect()
    }
}

fn encode_frame<T: Encodable>(msg: &T) -> Result<Frame> {
    msg.encode_frame()
        .map_err(|e| RelayError::serialization(format!("Failed to encode frame: {}", e)))
}
