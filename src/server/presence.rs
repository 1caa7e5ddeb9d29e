//! Presence directory for the chat relay
//!
//! The directory is the single source of truth for which connection is in
//! which room. Every operation takes the lock exactly once, so no caller
//! can observe a partially-updated directory.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::protocol::messages::ConnId;

/// Live state of one connection that has entered a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Connection ID (unique per live connection)
    pub conn_id: ConnId,
    /// Display name
    pub name: String,
    /// Current room
    pub room: String,
}

/// Registry of connected sessions and their room assignment
#[derive(Debug, Default)]
pub struct PresenceDirectory {
    /// Sessions indexed by connection ID
    sessions: RwLock<HashMap<ConnId, Session>>,
}

impl PresenceDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Upsert a session, replacing any prior entry for the same connection
    /// ID. Idempotent under repeated calls.
    pub async fn activate(&self, conn_id: &str, name: &str, room: &str) -> Session {
        let session = Session {
            conn_id: conn_id.to_string(),
            name: name.to_string(),
            room: room.to_string(),
        };
        let mut sessions = self.sessions.write().await;
        sessions.insert(conn_id.to_string(), session.clone());
        session
    }

    /// Delete and return the prior session, if any. Used on disconnect and
    /// on room-switch to learn which room is being left.
    pub async fn remove(&self, conn_id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(conn_id)
    }

    /// Look up a session by connection ID
    pub async fn lookup(&self, conn_id: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(conn_id).cloned()
    }

    /// All sessions whose room equals the given room, sorted by display
    /// name for stable member-list output
    pub async fn members_of(&self, room: &str) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        let mut members: Vec<Session> = sessions
            .values()
            .filter(|s| s.room == room)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        members
    }

    /// Distinct names of rooms with at least one member, sorted.
    /// Derived by scanning all sessions, O(sessions) per call.
    pub async fn active_rooms(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut rooms: Vec<String> = sessions.values().map(|s| s.room.clone()).collect();
        rooms.sort();
        rooms.dedup();
        rooms
    }

    /// Number of sessions currently in rooms
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Check whether the directory is empty
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_activate_and_lookup() {
        let directory = PresenceDirectory::new();

        let session = directory.activate("c1", "alice", "lobby").await;
        assert_eq!(session.name, "alice");
        assert_eq!(session.room, "lobby");

        let found = directory.lookup("c1").await.unwrap();
        assert_eq!(found, session);
        assert!(directory.lookup("c2").await.is_none());
    }

    #[tokio::test]
    async fn test_activate_is_idempotent_per_connection() {
        let directory = PresenceDirectory::new();

        directory.activate("c1", "alice", "lobby").await;
        directory.activate("c1", "alice", "lobby").await;
        directory.activate("c1", "alice", "games").await;

        // At most one session per connection ID
        assert_eq!(directory.len().await, 1);
        assert_eq!(directory.lookup("c1").await.unwrap().room, "games");
    }

    #[tokio::test]
    async fn test_remove_returns_prior_session() {
        let directory = PresenceDirectory::new();

        directory.activate("c1", "alice", "lobby").await;
        let removed = directory.remove("c1").await.unwrap();
        assert_eq!(removed.name, "alice");

        // Second removal signals absence
        assert!(directory.remove("c1").await.is_none());
        assert!(directory.is_empty().await);
    }

    #[tokio::test]
    async fn test_members_of_sorted_by_name() {
        let directory = PresenceDirectory::new();

        directory.activate("c2", "carol", "lobby").await;
        directory.activate("c1", "bob", "lobby").await;
        directory.activate("c3", "dave", "games").await;

        let members = directory.members_of("lobby").await;
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "bob");
        assert_eq!(members[1].name, "carol");

        assert!(directory.members_of("empty").await.is_empty());
    }

    #[tokio::test]
    async fn test_active_rooms_deduplicated() {
        let directory = PresenceDirectory::new();

        directory.activate("c1", "alice", "lobby").await;
        directory.activate("c2", "bob", "lobby").await;
        directory.activate("c3", "carol", "games").await;

        assert_eq!(directory.active_rooms().await, vec!["games", "lobby"]);
    }

    #[tokio::test]
    async fn test_room_switch_clears_stale_room() {
        let directory = PresenceDirectory::new();

        directory.activate("c1", "alice", "a").await;
        assert_eq!(directory.active_rooms().await, vec!["a"]);

        // Switch: remove then re-activate in the new room
        directory.remove("c1").await;
        directory.activate("c1", "alice", "b").await;

        let rooms = directory.active_rooms().await;
        assert!(!rooms.contains(&"a".to_string()));
        assert!(rooms.contains(&"b".to_string()));
    }

    #[tokio::test]
    async fn test_last_member_disconnect_empties_room() {
        let directory = PresenceDirectory::new();

        directory.activate("c1", "bob", "lobby").await;
        directory.remove("c1").await;

        assert!(directory.members_of("lobby").await.is_empty());
        assert!(!directory.active_rooms().await.contains(&"lobby".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_activate_remove_keeps_uniqueness() {
        use std::sync::Arc;

        let directory = Arc::new(PresenceDirectory::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let dir = Arc::clone(&directory);
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    dir.activate("c1", "alice", if i % 2 == 0 { "a" } else { "b" })
                        .await;
                    dir.remove("c1").await;
                    dir.activate("c1", "alice", "a").await;
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        // Interleaved activate/remove/activate never yields duplicates
        assert!(directory.len().await <= 1);
    }
}
