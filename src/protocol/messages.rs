//! Protocol message types for the chat relay
//!
//! All message payloads that can be serialized/deserialized within frames.
//! Uses serde for JSON serialization.

use serde::{Deserialize, Serialize};

use crate::current_timestamp;

/// Unique identifier for a live connection
pub type ConnId = String;

/// Display name used for server-originated notices
pub const ADMIN: &str = "Admin";

/// Protocol version spoken by this crate
pub const PROTOCOL_VERSION: u32 = 1;

// =============================================================================
// Control Messages (0x00 - 0x0F)
// =============================================================================

/// Initial handshake from client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    /// Protocol version
    pub version: u32,
    /// Origin of the connecting page, if any (checked against the
    /// environment-dependent cross-origin policy)
    pub origin: Option<String>,
}

impl Default for Hello {
    fn default() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            origin: None,
        }
    }
}

/// Server response to Hello
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloAck {
    /// Server protocol version
    pub version: u32,
    /// Session ID assigned to this connection
    pub session_id: String,
}

/// Request to create a new account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCreate {
    /// Desired display name
    pub username: String,
    /// Account email (unique key)
    pub email: String,
    /// Account secret
    pub secret: String,
}

/// Request to log in with existing credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAttempt {
    /// Account email
    pub email: String,
    /// Account secret
    pub secret: String,
}

/// Successful account-create or login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginOk {
    /// Username stored on the account
    pub username: String,
}

/// Failed account-create or login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginFailed {
    /// Human-readable failure reason
    pub reason: String,
}

/// Graceful disconnect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goodbye {
    /// Reason for disconnect
    pub reason: String,
}

// =============================================================================
// Room Commands (0x10 - 0x1F) - Client -> Server
// =============================================================================

/// Enter (or switch to) a named room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnterRoom {
    /// Display name to use in the room
    pub name: String,
    /// Room to join
    pub room: String,
}

/// Send a chat message to the current room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSend {
    /// Display name as known to the client
    pub name: String,
    /// Message text
    pub text: String,
}

/// Typing-activity signal for the current room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySend {
    /// Display name as known to the client
    pub name: String,
}

// =============================================================================
// Room Events (0x30 - 0x3F) - Server -> Client
// =============================================================================

/// A chat message delivered to a room, or privately to one connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender display name
    pub name: String,
    /// Message text
    pub text: String,
    /// Send timestamp (Unix ms)
    pub time: u64,
}

impl ChatMessage {
    /// Build a message stamped with the current time
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            time: current_timestamp(),
        }
    }

    /// Build a server-originated notice
    pub fn notice(text: impl Into<String>) -> Self {
        Self::new(ADMIN, text)
    }
}

/// One entry in a room's member list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    /// Display name
    pub name: String,
    /// Room the user is in
    pub room: String,
}

/// Member list for a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserList {
    /// Current members, sorted by display name
    pub users: Vec<UserEntry>,
}

/// Global list of active rooms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomList {
    /// Distinct room names with at least one member
    pub rooms: Vec<String>,
}

/// Typing-activity notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Display name of the typing user
    pub name: String,
}

// =============================================================================
// Error Message (0xFF)
// =============================================================================

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Error code
    pub code: u32,
    /// Error message
    pub message: String,
}

impl ErrorEvent {
    // Common error codes
    pub const INVALID_FRAME: u32 = 1001;
    pub const HANDSHAKE_REQUIRED: u32 = 1002;
    pub const ORIGIN_REJECTED: u32 = 1003;
    pub const SERVER_ERROR: u32 = 1010;

    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_FRAME, message)
    }

    pub fn handshake_required() -> Self {
        Self::new(Self::HANDSHAKE_REQUIRED, "Handshake required")
    }

    pub fn origin_rejected(origin: impl Into<String>) -> Self {
        Self::new(
            Self::ORIGIN_REJECTED,
            format!("Origin not allowed: {}", origin.into()),
        )
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(Self::SERVER_ERROR, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_enter_room() {
        let msg = EnterRoom {
            name: "alice".to_string(),
            room: "lobby".to_string(),
        };

        let json = serde_json::to_string(&msg).unwrap();
        let decoded: EnterRoom = serde_json::from_str(&json).unwrap();

        assert_eq!(msg.name, decoded.name);
        assert_eq!(msg.room, decoded.room);
    }

    #[test]
    fn test_serialize_chat_message() {
        let msg = ChatMessage {
            name: "alice".to_string(),
            text: "Test message".to_string(),
            time: 1234567890,
        };

        let json = serde_json::to_string(&msg).unwrap();
        let decoded: ChatMessage = serde_json::from_str(&json).unwrap();

        assert_eq!(msg.name, decoded.name);
        assert_eq!(msg.text, decoded.text);
        assert_eq!(msg.time, decoded.time);
    }

    #[test]
    fn test_notice_uses_admin_name() {
        let msg = ChatMessage::notice("Welcome!");
        assert_eq!(msg.name, ADMIN);
        assert_eq!(msg.text, "Welcome!");
        assert!(msg.time > 0);
    }

    #[test]
    fn test_error_constructors() {
        let err = ErrorEvent::origin_rejected("http://evil.example");
        assert_eq!(err.code, ErrorEvent::ORIGIN_REJECTED);

        let err = ErrorEvent::handshake_required();
        assert_eq!(err.code, ErrorEvent::HANDSHAKE_REQUIRED);
    }

    #[test]
    fn test_missing_field_is_rejected() {
        // Inbound payloads with missing required fields fail to decode
        let result = serde_json::from_str::<EnterRoom>(r#"{"name":"alice"}"#);
        assert!(result.is_err());
    }
}
