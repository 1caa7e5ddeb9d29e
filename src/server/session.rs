//! Per-connection session coordinator
//!
//! One coordinator drives one connection's lifecycle: connect, authenticate,
//! enter a room, chat, disconnect. The relay feeds it the connection's
//! inbound frames strictly in arrival order, so every transition below is
//! sequential for a given connection; shared state is only touched through
//! the synchronized directory, store, and broadcaster operations.
//!
//! Malformed or out-of-phase client frames are ignored rather than answered
//! with protocol errors.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::protocol::codec::Decodable;
use crate::protocol::frame::{Frame, FrameType};
use crate::protocol::messages::{
    AccountCreate, Activity, ActivitySend, ChatMessage, ChatSend, ConnId, EnterRoom, LoginAttempt,
    LoginFailed, LoginOk,
};
use crate::server::broadcast::RoomBroadcaster;
use crate::server::credentials::{CredentialError, CredentialStore, VerifyOutcome};
use crate::server::presence::PresenceDirectory;

/// Reason sent when the credential store is unreachable
const STORE_UNAVAILABLE: &str = "account service unavailable";

/// Lifecycle phase of one connection
#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    /// Connected, not yet authenticated
    Connected,
    /// Authenticated with a display name, not yet in a room
    Authenticated { name: String },
    /// Authenticated and in a room
    InRoom { name: String, room: String },
    /// Terminal
    Disconnected,
}

/// State machine driving one connection's lifecycle
pub struct SessionCoordinator {
    conn_id: ConnId,
    phase: Phase,
    store: Arc<CredentialStore>,
    directory: Arc<PresenceDirectory>,
    broadcaster: RoomBroadcaster,
}

impl SessionCoordinator {
    /// Create a coordinator for a freshly connected client
    pub fn new(
        conn_id: ConnId,
        store: Arc<CredentialStore>,
        directory: Arc<PresenceDirectory>,
        broadcaster: RoomBroadcaster,
    ) -> Self {
        Self {
            conn_id,
            phase: Phase::Connected,
            store,
            directory,
            broadcaster,
        }
    }

    /// Connection ID this coordinator belongs to
    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    /// Entry transition: greet the new connection privately, never broadcast
    pub async fn on_connect(&self) -> Result<()> {
        self.broadcaster
            .to_connection(&self.conn_id, &ChatMessage::notice("Welcome to the chat relay!"))
            .await
    }

    /// Dispatch one inbound frame. Malformed payloads are logged and
    /// dropped; they never take the connection down.
    pub async fn handle_frame(&mut self, frame: Frame) -> Result<()> {
        if self.phase == Phase::Disconnected {
            return Ok(());
        }

        match frame.frame_type {
            FrameType::AccountCreate => match AccountCreate::decode_frame(&frame) {
                Ok(msg) => self.handle_account_create(msg).await?,
                Err(e) => warn!("Ignoring malformed AccountCreate: {}", e),
            },
            FrameType::LoginAttempt => match LoginAttempt::decode_frame(&frame) {
                Ok(msg) => self.handle_login(msg).await?,
                Err(e) => warn!("Ignoring malformed LoginAttempt: {}", e),
            },
            FrameType::EnterRoom => match EnterRoom::decode_frame(&frame) {
                Ok(msg) => self.handle_enter_room(msg).await?,
                Err(e) => warn!("Ignoring malformed EnterRoom: {}", e),
            },
            FrameType::ChatSend => match ChatSend::decode_frame(&frame) {
                Ok(msg) => self.handle_chat(msg).await?,
                Err(e) => warn!("Ignoring malformed ChatSend: {}", e),
            },
            FrameType::ActivitySend => match ActivitySend::decode_frame(&frame) {
                Ok(msg) => self.handle_activity(msg).await?,
                Err(e) => warn!("Ignoring malformed ActivitySend: {}", e),
            },
            other => {
                warn!("Unexpected frame type {:?} from client", other);
            }
        }

        Ok(())
    }

    /// Exit transition. Runs exactly once: the phase guard makes a second
    /// call a no-op, and `PresenceDirectory::remove` returning `None`
    /// protects against double-removal regardless.
    pub async fn on_disconnect(&mut self) -> Result<()> {
        if self.phase == Phase::Disconnected {
            return Ok(());
        }
        self.phase = Phase::Disconnected;

        let prior = self.directory.remove(&self.conn_id).await;

        if let Some(session) = prior {
            self.broadcaster
                .to_room(
                    &session.room,
                    &ChatMessage::notice(format!("{} has left the room", session.name)),
                )
                .await?;

            let roster = self.broadcaster.roster(&session.room).await;
            self.broadcaster.to_room(&session.room, &roster).await?;

            let index = self.broadcaster.room_index().await;
            self.broadcaster.to_all(&index).await?;

            info!("{} disconnected from room {}", session.name, session.room);
        } else {
            debug!("Connection {} disconnected without a room", self.conn_id);
        }

        Ok(())
    }

    /// Create an account. Responds with exactly one outcome event and does
    /// not log the user in; login is an explicit separate step.
    async fn handle_account_create(&mut self, msg: AccountCreate) -> Result<()> {
        match self.store.create(&msg.username, &msg.email, &msg.secret).await {
            Ok(()) => {
                self.broadcaster
                    .to_connection(
                        &self.conn_id,
                        &LoginOk {
                            username: msg.username,
                        },
                    )
                    .await?;
            }
            Err(CredentialError::DuplicateEmail) => {
                self.broadcaster
                    .to_connection(
                        &self.conn_id,
                        &LoginFailed {
                            reason: "email already registered".to_string(),
                        },
                    )
                    .await?;
            }
            Err(CredentialError::Store(e)) => {
                error!("Account create failed: {}", e);
                self.broadcaster
                    .to_connection(
                        &self.conn_id,
                        &LoginFailed {
                            reason: STORE_UNAVAILABLE.to_string(),
                        },
                    )
                    .await?;
            }
        }

        Ok(())
    }

    /// Verify a login. Exactly one of three outcomes; the phase advances to
    /// Authenticated only on a match.
    async fn handle_login(&mut self, msg: LoginAttempt) -> Result<()> {
        match self.store.verify(&msg.email, &msg.secret).await {
            Ok(VerifyOutcome::Match(username)) => {
                if matches!(self.phase, Phase::Connected | Phase::Authenticated { .. }) {
                    self.phase = Phase::Authenticated {
                        name: username.clone(),
                    };
                }
                info!("{} logged in", username);
                self.broadcaster
                    .to_connection(&self.conn_id, &LoginOk { username })
                    .await?;
            }
            Ok(VerifyOutcome::NoSuchEmail) => {
                self.broadcaster
                    .to_connection(
                        &self.conn_id,
                        &LoginFailed {
                            reason: "email not found".to_string(),
                        },
                    )
                    .await?;
            }
            Ok(VerifyOutcome::SecretMismatch) => {
                self.broadcaster
                    .to_connection(
                        &self.conn_id,
                        &LoginFailed {
                            reason: "incorrect secret".to_string(),
                        },
                    )
                    .await?;
            }
            Err(e) => {
                error!("Login verification failed: {}", e);
                self.broadcaster
                    .to_connection(
                        &self.conn_id,
                        &LoginFailed {
                            reason: STORE_UNAVAILABLE.to_string(),
                        },
                    )
                    .await?;
            }
        }

        Ok(())
    }

    /// Enter (or switch to) a room. When switching, the old room sees the
    /// leave before the new room sees the join; the five join effects run
    /// back-to-back within this connection's sequential step.
    async fn handle_enter_room(&mut self, msg: EnterRoom) -> Result<()> {
        let name = msg.name.trim().to_string();
        let room = msg.room.trim().to_string();

        if name.is_empty() || room.is_empty() {
            debug!("Ignoring enter-room with empty name or room");
            return Ok(());
        }

        let prev_room = match &self.phase {
            Phase::Connected => {
                debug!("Ignoring enter-room from unauthenticated connection");
                return Ok(());
            }
            Phase::Disconnected => return Ok(()),
            Phase::Authenticated { .. } => None,
            Phase::InRoom { room: current, .. } => Some(current.clone()),
        };

        if let Some(old) = prev_room {
            if old != room {
                self.leave_room(&old).await?;
            }
        }

        self.directory.activate(&self.conn_id, &name, &room).await;
        self.phase = Phase::InRoom {
            name: name.clone(),
            room: room.clone(),
        };

        // To the user who joined
        self.broadcaster
            .to_connection(
                &self.conn_id,
                &ChatMessage::notice(format!("You have joined the {} chat room", room)),
            )
            .await?;

        // To everyone else in the room
        self.broadcaster
            .to_room_except_sender(
                &room,
                &ChatMessage::notice(format!("{} has joined the room", name)),
                &self.conn_id,
            )
            .await?;

        // Update the member list for the room
        let roster = self.broadcaster.roster(&room).await;
        self.broadcaster.to_room(&room, &roster).await?;

        // Update the room list for everyone
        let index = self.broadcaster.room_index().await;
        self.broadcaster.to_all(&index).await?;

        info!("{} joined room {}", name, room);
        Ok(())
    }

    /// Leave the current room: drop the directory entry, then tell the old
    /// room who left and what its member list now is
    async fn leave_room(&mut self, old: &str) -> Result<()> {
        if let Some(session) = self.directory.remove(&self.conn_id).await {
            self.broadcaster
                .to_room(
                    old,
                    &ChatMessage::notice(format!("{} has left the room", session.name)),
                )
                .await?;

            let roster = self.broadcaster.roster(old).await;
            self.broadcaster.to_room(old, &roster).await?;
        }

        Ok(())
    }

    /// Broadcast a chat message to the sender's room, sender included.
    /// Stamped with the session's display name and a send timestamp.
    async fn handle_chat(&mut self, msg: ChatSend) -> Result<()> {
        let (name, room) = match &self.phase {
            Phase::InRoom { name, room } => (name.clone(), room.clone()),
            _ => {
                debug!("Ignoring message from connection not in a room");
                return Ok(());
            }
        };

        self.broadcaster
            .to_room(&room, &ChatMessage::new(name, msg.text))
            .await
    }

    /// Relay a typing-activity signal to every other member of the room
    async fn handle_activity(&mut self, _msg: ActivitySend) -> Result<()> {
        let (name, room) = match &self.phase {
            Phase::InRoom { name, room } => (name.clone(), room.clone()),
            _ => {
                debug!("Ignoring activity from connection not in a room");
                return Ok(());
            }
        };

        self.broadcaster
            .to_room_except_sender(&room, &Activity { name }, &self.conn_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::Encodable;
    use crate::protocol::messages::{RoomList, UserList};
    use crate::transport::groups::MulticastHub;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        store: Arc<CredentialStore>,
        directory: Arc<PresenceDirectory>,
        hub: Arc<MulticastHub>,
        broadcaster: RoomBroadcaster,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = Arc::new(CredentialStore::open(dir.path().join("logins.json")).unwrap());
            let directory = Arc::new(PresenceDirectory::new());
            let hub = Arc::new(MulticastHub::new());
            let broadcaster = RoomBroadcaster::new(Arc::clone(&directory), Arc::clone(&hub));
            Self {
                store,
                directory,
                hub,
                broadcaster,
                _dir: dir,
            }
        }

        async fn coordinator(&self, conn_id: &str) -> (SessionCoordinator, UnboundedReceiver<Frame>) {
            let rx = self.hub.register(conn_id).await;
            let coordinator = SessionCoordinator::new(
                conn_id.to_string(),
                Arc::clone(&self.store),
                Arc::clone(&self.directory),
                self.broadcaster.clone(),
            );
            (coordinator, rx)
        }
    }

    fn received(rx: &mut UnboundedReceiver<Frame>) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    fn frame_of<T: Encodable>(msg: &T) -> Frame {
        msg.encode_frame().unwrap()
    }

    async fn login_as(
        coordinator: &mut SessionCoordinator,
        fixture: &Fixture,
        username: &str,
        email: &str,
    ) {
        fixture.store.create(username, email, "pw").await.unwrap();
        coordinator
            .handle_frame(frame_of(&LoginAttempt {
                email: email.to_string(),
                secret: "pw".to_string(),
            }))
            .await
            .unwrap();
    }

    async fn enter(coordinator: &mut SessionCoordinator, name: &str, room: &str) {
        coordinator
            .handle_frame(frame_of(&EnterRoom {
                name: name.to_string(),
                room: room.to_string(),
            }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_welcome_is_private() {
        let fixture = Fixture::new();
        let (c1, mut rx1) = fixture.coordinator("c1").await;
        let (_c2, mut rx2) = fixture.coordinator("c2").await;

        c1.on_connect().await.unwrap();

        let frames = received(&mut rx1);
        assert_eq!(frames.len(), 1);
        let msg = ChatMessage::decode_frame(&frames[0]).unwrap();
        assert_eq!(msg.name, crate::protocol::messages::ADMIN);

        assert!(received(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn test_account_create_and_login_outcomes() {
        let fixture = Fixture::new();
        let (mut c1, mut rx1) = fixture.coordinator("c1").await;

        // Create succeeds but does not log in
        c1.handle_frame(frame_of(&AccountCreate {
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            secret: "s1".to_string(),
        }))
        .await
        .unwrap();

        let frames = received(&mut rx1);
        assert_eq!(frames.len(), 1);
        let ok = LoginOk::decode_frame(&frames[0]).unwrap();
        assert_eq!(ok.username, "alice");
        assert_eq!(c1.phase, Phase::Connected);

        // Duplicate email, different username
        c1.handle_frame(frame_of(&AccountCreate {
            username: "other".to_string(),
            email: "a@x.com".to_string(),
            secret: "s2".to_string(),
        }))
        .await
        .unwrap();

        let frames = received(&mut rx1);
        assert_eq!(frames.len(), 1);
        let failed = LoginFailed::decode_frame(&frames[0]).unwrap();
        assert_eq!(failed.reason, "email already registered");

        // Wrong secret
        c1.handle_frame(frame_of(&LoginAttempt {
            email: "a@x.com".to_string(),
            secret: "wrong".to_string(),
        }))
        .await
        .unwrap();

        let failed = LoginFailed::decode_frame(&received(&mut rx1)[0]).unwrap();
        assert_eq!(failed.reason, "incorrect secret");
        assert_eq!(c1.phase, Phase::Connected);

        // Unknown email
        c1.handle_frame(frame_of(&LoginAttempt {
            email: "b@x.com".to_string(),
            secret: "s1".to_string(),
        }))
        .await
        .unwrap();

        let failed = LoginFailed::decode_frame(&received(&mut rx1)[0]).unwrap();
        assert_eq!(failed.reason, "email not found");

        // Correct credentials advance the phase
        c1.handle_frame(frame_of(&LoginAttempt {
            email: "a@x.com".to_string(),
            secret: "s1".to_string(),
        }))
        .await
        .unwrap();

        let ok = LoginOk::decode_frame(&received(&mut rx1)[0]).unwrap();
        assert_eq!(ok.username, "alice");
        assert_eq!(
            c1.phase,
            Phase::Authenticated {
                name: "alice".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_enter_room_requires_authentication() {
        let fixture = Fixture::new();
        let (mut c1, mut rx1) = fixture.coordinator("c1").await;

        enter(&mut c1, "bob", "lobby").await;

        assert!(received(&mut rx1).is_empty());
        assert!(fixture.directory.lookup("c1").await.is_none());
    }

    #[tokio::test]
    async fn test_enter_room_with_empty_fields_is_noop() {
        let fixture = Fixture::new();
        let (mut c1, mut rx1) = fixture.coordinator("c1").await;
        login_as(&mut c1, &fixture, "bob", "b@x.com").await;
        let _ = received(&mut rx1);

        enter(&mut c1, "bob", "  ").await;
        enter(&mut c1, "", "lobby").await;

        assert!(received(&mut rx1).is_empty());
        assert!(fixture.directory.lookup("c1").await.is_none());
    }

    #[tokio::test]
    async fn test_join_sequence_effects() {
        let fixture = Fixture::new();
        let (mut c1, mut rx1) = fixture.coordinator("c1").await;
        let (mut c2, mut rx2) = fixture.coordinator("c2").await;

        login_as(&mut c1, &fixture, "bob", "b@x.com").await;
        login_as(&mut c2, &fixture, "carol", "c@x.com").await;
        let _ = received(&mut rx1);
        let _ = received(&mut rx2);

        enter(&mut c1, "bob", "lobby").await;
        let _ = received(&mut rx1);
        let _ = received(&mut rx2);

        enter(&mut c2, "carol", "lobby").await;

        // bob sees: joined notice, updated member list, updated room list
        let frames = received(&mut rx1);
        let notice = ChatMessage::decode_frame(&frames[0]).unwrap();
        assert_eq!(notice.text, "carol has joined the room");

        let roster = frames
            .iter()
            .find(|f| f.frame_type == FrameType::UserList)
            .map(|f| UserList::decode_frame(f).unwrap())
            .unwrap();
        let names: Vec<&str> = roster.users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["bob", "carol"]);

        // carol sees: private joined notice, member list, room list, but
        // not the room-wide joined notice
        let frames = received(&mut rx2);
        let notice = ChatMessage::decode_frame(&frames[0]).unwrap();
        assert_eq!(notice.text, "You have joined the lobby chat room");
        assert!(frames.iter().any(|f| f.frame_type == FrameType::UserList));
        assert!(frames.iter().any(|f| f.frame_type == FrameType::RoomList));
    }

    #[tokio::test]
    async fn test_room_switch_leaves_old_room() {
        let fixture = Fixture::new();
        let (mut c1, mut rx1) = fixture.coordinator("c1").await;
        let (mut c2, mut rx2) = fixture.coordinator("c2").await;

        login_as(&mut c1, &fixture, "bob", "b@x.com").await;
        login_as(&mut c2, &fixture, "carol", "c@x.com").await;
        enter(&mut c1, "bob", "a").await;
        enter(&mut c2, "carol", "a").await;
        let _ = received(&mut rx1);
        let _ = received(&mut rx2);

        enter(&mut c1, "bob", "b").await;

        // carol, still in room a, sees bob leave and the shrunken roster
        let frames = received(&mut rx2);
        let notice = ChatMessage::decode_frame(&frames[0]).unwrap();
        assert_eq!(notice.text, "bob has left the room");

        let roster = frames
            .iter()
            .find(|f| f.frame_type == FrameType::UserList)
            .map(|f| UserList::decode_frame(f).unwrap())
            .unwrap();
        assert_eq!(roster.users.len(), 1);
        assert_eq!(roster.users[0].name, "carol");

        // room a still active (carol), room b now active
        let rooms = fixture.directory.active_rooms().await;
        assert_eq!(rooms, vec!["a", "b"]);

        // bob's switch from a sole-member room drops the old room entirely
        enter(&mut c2, "carol", "b").await;
        let rooms = fixture.directory.active_rooms().await;
        assert_eq!(rooms, vec!["b"]);
        let _ = received(&mut rx1);
    }

    #[tokio::test]
    async fn test_message_broadcast_includes_sender() {
        let fixture = Fixture::new();
        let (mut c1, mut rx1) = fixture.coordinator("c1").await;
        let (mut c2, mut rx2) = fixture.coordinator("c2").await;

        login_as(&mut c1, &fixture, "bob", "b@x.com").await;
        login_as(&mut c2, &fixture, "carol", "c@x.com").await;
        enter(&mut c1, "bob", "lobby").await;
        enter(&mut c2, "carol", "lobby").await;
        let _ = received(&mut rx1);
        let _ = received(&mut rx2);

        c1.handle_frame(frame_of(&ChatSend {
            name: "bob".to_string(),
            text: "hello".to_string(),
        }))
        .await
        .unwrap();

        for rx in [&mut rx1, &mut rx2] {
            let frames = received(rx);
            assert_eq!(frames.len(), 1);
            let msg = ChatMessage::decode_frame(&frames[0]).unwrap();
            assert_eq!(msg.name, "bob");
            assert_eq!(msg.text, "hello");
            assert!(msg.time > 0);
        }
    }

    #[tokio::test]
    async fn test_message_without_room_is_noop() {
        let fixture = Fixture::new();
        let (mut c1, mut rx1) = fixture.coordinator("c1").await;
        let (mut c2, mut rx2) = fixture.coordinator("c2").await;

        login_as(&mut c1, &fixture, "bob", "b@x.com").await;
        login_as(&mut c2, &fixture, "carol", "c@x.com").await;
        enter(&mut c2, "carol", "lobby").await;
        let _ = received(&mut rx1);
        let _ = received(&mut rx2);

        // bob is authenticated but roomless; nothing is broadcast anywhere
        c1.handle_frame(frame_of(&ChatSend {
            name: "bob".to_string(),
            text: "hello".to_string(),
        }))
        .await
        .unwrap();

        assert!(received(&mut rx1).is_empty());
        assert!(received(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn test_activity_excludes_sender() {
        let fixture = Fixture::new();
        let (mut c1, mut rx1) = fixture.coordinator("c1").await;
        let (mut c2, mut rx2) = fixture.coordinator("c2").await;

        login_as(&mut c1, &fixture, "bob", "b@x.com").await;
        login_as(&mut c2, &fixture, "carol", "c@x.com").await;
        enter(&mut c1, "bob", "lobby").await;
        enter(&mut c2, "carol", "lobby").await;
        let _ = received(&mut rx1);
        let _ = received(&mut rx2);

        c1.handle_frame(frame_of(&ActivitySend {
            name: "bob".to_string(),
        }))
        .await
        .unwrap();

        assert!(received(&mut rx1).is_empty());
        let frames = received(&mut rx2);
        assert_eq!(frames.len(), 1);
        let activity = Activity::decode_frame(&frames[0]).unwrap();
        assert_eq!(activity.name, "bob");
    }

    #[tokio::test]
    async fn test_disconnect_notifies_room_once() {
        let fixture = Fixture::new();
        let (mut c1, mut rx1) = fixture.coordinator("c1").await;
        let (mut c2, mut rx2) = fixture.coordinator("c2").await;

        login_as(&mut c1, &fixture, "bob", "b@x.com").await;
        login_as(&mut c2, &fixture, "carol", "c@x.com").await;
        enter(&mut c1, "bob", "lobby").await;
        enter(&mut c2, "carol", "lobby").await;
        let _ = received(&mut rx1);
        let _ = received(&mut rx2);

        c2.on_disconnect().await.unwrap();

        let frames = received(&mut rx1);
        let notice = ChatMessage::decode_frame(&frames[0]).unwrap();
        assert_eq!(notice.text, "carol has left the room");

        let roster = frames
            .iter()
            .find(|f| f.frame_type == FrameType::UserList)
            .map(|f| UserList::decode_frame(f).unwrap())
            .unwrap();
        assert_eq!(roster.users.len(), 1);
        assert_eq!(roster.users[0].name, "bob");

        let rooms = frames
            .iter()
            .find(|f| f.frame_type == FrameType::RoomList)
            .map(|f| RoomList::decode_frame(f).unwrap())
            .unwrap();
        assert_eq!(rooms.rooms, vec!["lobby"]);

        // Second disconnect is a no-op: no duplicate notices
        c2.on_disconnect().await.unwrap();
        assert!(received(&mut rx1).is_empty());
    }

    #[tokio::test]
    async fn test_last_member_disconnect_empties_room() {
        let fixture = Fixture::new();
        let (mut c1, mut rx1) = fixture.coordinator("c1").await;

        login_as(&mut c1, &fixture, "bob", "b@x.com").await;
        enter(&mut c1, "bob", "lobby").await;
        let _ = received(&mut rx1);

        c1.on_disconnect().await.unwrap();

        assert!(fixture.directory.members_of("lobby").await.is_empty());
        assert!(fixture.directory.active_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_skipped() {
        let fixture = Fixture::new();
        let (mut c1, mut rx1) = fixture.coordinator("c1").await;

        // Missing required field: dropped without a response
        let frame = Frame::new(FrameType::EnterRoom, r#"{"name":"bob"}"#);
        c1.handle_frame(frame).await.unwrap();

        assert!(received(&mut rx1).is_empty());
    }
}
