//! Codec for encoding/decoding protocol messages to/from frames
//!
//! This module provides the bridge between typed messages and binary frames.

use super::frame::{Frame, FrameType};
use super::messages::*;
use bytes::Bytes;
use std::io::{self, Error as IoError, ErrorKind};

/// Trait for messages that can be encoded to frames
pub trait Encodable {
    /// Get the frame type for this message
    fn frame_type(&self) -> FrameType;

    /// Encode the message payload to bytes
    fn encode_payload(&self) -> io::Result<Bytes>;

    /// Encode the complete frame
    fn encode_frame(&self) -> io::Result<Frame> {
        Ok(Frame::new(self.frame_type(), self.encode_payload()?))
    }
}

/// Trait for messages that can be decoded from frames
pub trait Decodable: Sized {
    /// Expected frame type for this message
    fn expected_frame_type() -> FrameType;

    /// Decode the message from a payload
    fn decode_payload(payload: &[u8]) -> io::Result<Self>;

    /// Decode from a complete frame, validating the frame type
    fn decode_frame(frame: &Frame) -> io::Result<Self> {
        if frame.frame_type != Self::expected_frame_type() {
            return Err(IoError::new(
                ErrorKind::InvalidData,
                format!(
                    "Expected frame type {:?}, got {:?}",
                    Self::expected_frame_type(),
                    frame.frame_type
                ),
            ));
        }
        Self::decode_payload(&frame.payload)
    }
}

/// Helper macro to implement Encodable and Decodable for a message type
macro_rules! impl_codec {
    ($type:ty, $frame_type:expr) => {
        impl Encodable for $type {
            fn frame_type(&self) -> FrameType {
                $frame_type
            }

            fn encode_payload(&self) -> io::Result<Bytes> {
                serde_json::to_vec(self)
                    .map(Bytes::from)
                    .map_err(|e| IoError::new(ErrorKind::InvalidData, e))
            }
        }

        impl Decodable for $type {
            fn expected_frame_type() -> FrameType {
                $frame_type
            }

            fn decode_payload(payload: &[u8]) -> io::Result<Self> {
                serde_json::from_slice(payload).map_err(|e| IoError::new(ErrorKind::InvalidData, e))
            }
        }
    };
}

// Control messages
impl_codec!(Hello, FrameType::Hello);
impl_codec!(HelloAck, FrameType::HelloAck);
impl_codec!(AccountCreate, FrameType::AccountCreate);
impl_codec!(LoginAttempt, FrameType::LoginAttempt);
impl_codec!(LoginOk, FrameType::LoginOk);
impl_codec!(LoginFailed, FrameType::LoginFailed);
impl_codec!(Goodbye, FrameType::Goodbye);

// Room commands
impl_codec!(EnterRoom, FrameType::EnterRoom);
impl_codec!(ChatSend, FrameType::ChatSend);
impl_codec!(ActivitySend, FrameType::ActivitySend);

// Room events
impl_codec!(ChatMessage, FrameType::ChatMessage);
impl_codec!(UserList, FrameType::UserList);
impl_codec!(RoomList, FrameType::RoomList);
impl_codec!(Activity, FrameType::Activity);

// Error message
impl_codec!(ErrorEvent, FrameType::Error);

/// Decode any frame into a typed message enum
#[derive(Debug, Clone)]
pub enum DecodedMessage {
    // Control
    Hello(Hello),
    HelloAck(HelloAck),
    AccountCreate(AccountCreate),
    LoginAttempt(LoginAttempt),
    LoginOk(LoginOk),
    LoginFailed(LoginFailed),
    Goodbye(Goodbye),

    // Room commands
    EnterRoom(EnterRoom),
    ChatSend(ChatSend),
    ActivitySend(ActivitySend),

    // Room events
    ChatMessage(ChatMessage),
    UserList(UserList),
    RoomList(RoomList),
    Activity(Activity),

    // Error
    Error(ErrorEvent),
}

impl DecodedMessage {
    /// Decode a frame into a typed message
    pub fn decode(frame: &Frame) -> io::Result<Self> {
        let payload = &frame.payload;

        match frame.frame_type {
            // Control
            FrameType::Hello => Ok(Self::Hello(serde_json::from_slice(payload)?)),
            FrameType::HelloAck => Ok(Self::HelloAck(serde_json::from_slice(payload)?)),
            FrameType::AccountCreate => Ok(Self::AccountCreate(serde_json::from_slice(payload)?)),
            FrameType::LoginAttempt => Ok(Self::LoginAttempt(serde_json::from_slice(payload)?)),
            FrameType::LoginOk => Ok(Self::LoginOk(serde_json::from_slice(payload)?)),
            FrameType::LoginFailed => Ok(Self::LoginFailed(serde_json::from_slice(payload)?)),
            FrameType::Goodbye => Ok(Self::Goodbye(serde_json::from_slice(payload)?)),

            // Room commands
            FrameType::EnterRoom => Ok(Self::EnterRoom(serde_json::from_slice(payload)?)),
            FrameType::ChatSend => Ok(Self::ChatSend(serde_json::from_slice(payload)?)),
            FrameType::ActivitySend => Ok(Self::ActivitySend(serde_json::from_slice(payload)?)),

            // Room events
            FrameType::ChatMessage => Ok(Self::ChatMessage(serde_json::from_slice(payload)?)),
            FrameType::UserList => Ok(Self::UserList(serde_json::from_slice(payload)?)),
            FrameType::RoomList => Ok(Self::RoomList(serde_json::from_slice(payload)?)),
            FrameType::Activity => Ok(Self::Activity(serde_json::from_slice(payload)?)),

            // Error
            FrameType::Error => Ok(Self::Error(serde_json::from_slice(payload)?)),
        }
    }

    /// Get the frame type of this message
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::Hello(_) => FrameType::Hello,
            Self::HelloAck(_) => FrameType::HelloAck,
            Self::AccountCreate(_) => FrameType::AccountCreate,
            Self::LoginAttempt(_) => FrameType::LoginAttempt,
            Self::LoginOk(_) => FrameType::LoginOk,
            Self::LoginFailed(_) => FrameType::LoginFailed,
            Self::Goodbye(_) => FrameType::Goodbye,
            Self::EnterRoom(_) => FrameType::EnterRoom,
            Self::ChatSend(_) => FrameType::ChatSend,
            Self::ActivitySend(_) => FrameType::ActivitySend,
            Self::ChatMessage(_) => FrameType::ChatMessage,
            Self::UserList(_) => FrameType::UserList,
            Self::RoomList(_) => FrameType::RoomList,
            Self::Activity(_) => FrameType::Activity,
            Self::Error(_) => FrameType::Error,
        }
    }

    /// Check if this is a control message
    pub fn is_control(&self) -> bool {
        self.frame_type().is_control()
    }

    /// Check if this is a client room command
    pub fn is_room_command(&self) -> bool {
        self.frame_type().is_room_command()
    }

    /// Check if this is a server-to-client room event
    pub fn is_room_event(&self) -> bool {
        self.frame_type().is_room_event()
    }
}

/// Encode a message directly to bytes (convenience function)
pub fn encode<T: Encodable>(msg: &T) -> io::Result<Bytes> {
    msg.encode_frame().map(|f| f.encode_to_bytes())
}

/// Decode a frame to a specific message type (convenience function)
pub fn decode<T: Decodable>(frame: &Frame) -> io::Result<T> {
    T::decode_frame(frame)
}
