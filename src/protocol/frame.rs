//! Binary frame protocol with length-prefixed messages
//!
//! Frame format:
//! ```text
//! +--------+--------+------------------+
//! | type   | length | payload          |
//! | (1 byte)| (4 bytes, BE) | (variable)  |
//! +--------+--------+------------------+
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::{self, Cursor};

/// Frame header size: 1 byte type + 4 bytes length
pub const FRAME_HEADER_SIZE: usize = 5;

/// Maximum frame payload size (1 MB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Frame types for different message categories
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    // Control messages (0x00 - 0x0F)
    Hello = 0x00,
    HelloAck = 0x01,
    AccountCreate = 0x02,
    LoginAttempt = 0x03,
    LoginOk = 0x04,
    LoginFailed = 0x05,
    Goodbye = 0x06,

    // Room commands, client -> server (0x10 - 0x1F)
    EnterRoom = 0x10,
    ChatSend = 0x11,
    ActivitySend = 0x12,

    // Room events, server -> client (0x30 - 0x3F)
    ChatMessage = 0x30,
    UserList = 0x31,
    RoomList = 0x32,
    Activity = 0x33,

    // Error (0xFF)
    Error = 0xFF,
}

impl FrameType {
    /// Convert from u8, returns None for unknown types
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(FrameType::Hello),
            0x01 => Some(FrameType::HelloAck),
            0x02 => Some(FrameType::AccountCreate),
            0x03 => Some(FrameType::LoginAttempt),
            0x04 => Some(FrameType::LoginOk),
            0x05 => Some(FrameType::LoginFailed),
            0x06 => Some(FrameType::Goodbye),

            0x10 => Some(FrameType::EnterRoom),
            0x11 => Some(FrameType::ChatSend),
            0x12 => Some(FrameType::ActivitySend),

            0x30 => Some(FrameType::ChatMessage),
            0x31 => Some(FrameType::UserList),
            0x32 => Some(FrameType::RoomList),
            0x33 => Some(FrameType::Activity),

            0xFF => Some(FrameType::Error),
            _ => None,
        }
    }

    /// Check if this frame type is valid for the control plane (auth, handshake)
    pub fn is_control(&self) -> bool {
        (*self as u8) < 0x10
    }

    /// Check if this frame type is a client room command
    pub fn is_room_command(&self) -> bool {
        let val = *self as u8;
        (0x10..0x30).contains(&val)
    }

    /// Check if this frame type is a server-to-client room event
    pub fn is_room_event(&self) -> bool {
        let val = *self as u8;
        (0x30..0x40).contains(&val)
    }
}

/// A single protocol frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame with the given type and payload
    pub fn new(frame_type: FrameType, payload: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            payload: payload.into(),
        }
    }

    /// Create an empty frame (no payload)
    pub fn empty(frame_type: FrameType) -> Self {
        Self {
            frame_type,
            payload: Bytes::new(),
        }
    }

    /// Get the total encoded size of this frame
    pub fn encoded_size(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload.len()
    }

    /// Encode this frame into a buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_size());
        buf.put_u8(self.frame_type as u8);
        buf.put_u32(self.payload.len() as u32);
        buf.put_slice(&self.payload);
    }

    /// Encode this frame into a new Bytes
    pub fn encode_to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_size());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Try to decode a frame from a buffer
    /// Returns Ok(Some(frame)) if successful, Ok(None) if more data needed
    pub fn decode(buf: &mut BytesMut) -> io::Result<Option<Frame>> {
        // Check if we have enough data for the header
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        // Peek at the header without consuming
        let mut cursor = Cursor::new(&buf[..]);
        let frame_type_byte = cursor.get_u8();
        let payload_len = cursor.get_u32() as usize;

        // Validate frame type
        let frame_type = FrameType::from_u8(frame_type_byte).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown frame type: 0x{:02X}", frame_type_byte),
            )
        })?;

        // Validate payload size
        if payload_len > MAX_FRAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Frame payload too large: {} bytes (max: {})",
                    payload_len, MAX_FRAME_SIZE
                ),
            ));
        }

        // Check if we have the full frame
        let total_size = FRAME_HEADER_SIZE + payload_len;
        if buf.len() < total_size {
            return Ok(None);
        }

        // Consume the header
        buf.advance(FRAME_HEADER_SIZE);

        // Extract payload
        let payload = buf.split_to(payload_len).freeze();

        Ok(Some(Frame {
            frame_type,
            payload,
        }))
    }

    /// Decode a single frame from a complete buffer (no streaming)
    pub fn decode_complete(data: &[u8]) -> io::Result<Frame> {
        if data.len() < FRAME_HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Incomplete frame header",
            ));
        }

        let frame_type_byte = data[0];
        let payload_len = u32::from_be_bytes([data[1], data[2], data[3], data[4]]) as usize;

        let frame_type = FrameType::from_u8(frame_type_byte).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown frame type: 0x{:02X}", frame_type_byte),
            )
        })?;

        if payload_len > MAX_FRAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Frame payload too large: {} bytes (max: {})",
                    payload_len, MAX_FRAME_SIZE
                ),
            ));
        }

        let expected_len = FRAME_HEADER_SIZE + payload_len;
        if data.len() < expected_len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Incomplete frame: expected {} bytes, got {}",
                    expected_len,
                    data.len()
                ),
            ));
        }

        let payload = Bytes::copy_from_slice(&data[FRAME_HEADER_SIZE..expected_len]);

        Ok(Frame {
            frame_type,
            payload,
        })
    }
}

/// Frame encoder/decoder for streaming use
#[derive(Debug, Default)]
pub struct FrameCodec {
    buffer: BytesMut,
}

impl FrameCodec {
    /// Create a new frame codec
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Create a new frame codec with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Feed data into the codec
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next frame
    pub fn decode_next(&mut self) -> io::Result<Option<Frame>> {
        Frame::decode(&mut self.buffer)
    }

    /// Get the current buffer length
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_type_roundtrip() {
        let types = [
            FrameType::Hello,
            FrameType::AccountCreate,
            FrameType::LoginAttempt,
            FrameType::EnterRoom,
            FrameType::ChatSend,
            FrameType::ChatMessage,
            FrameType::UserList,
            FrameType::RoomList,
            FrameType::Activity,
            FrameType::Error,
        ];

        for frame_type in types {
            let byte = frame_type as u8;
            let recovered = FrameType::from_u8(byte).unwrap();
            assert_eq!(frame_type, recovered);
        }
    }

    #[test]
    fn test_frame_encode_decode() {
        let original = Frame::new(FrameType::ChatSend, "Hello, World!");
        let encoded = original.encode_to_bytes();

        let decoded = Frame::decode_complete(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_frame_codec_streaming() {
        let mut codec = FrameCodec::new();

        // Use larger payloads to ensure partial frame scenario
        let frame1 = Frame::new(FrameType::ChatSend, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let frame2 = Frame::new(
            FrameType::ActivitySend,
            vec![11, 12, 13, 14, 15, 16, 17, 18, 19, 20],
        );

        // Encode both frames
        let mut data = BytesMut::new();
        frame1.encode(&mut data);
        frame2.encode(&mut data);

        // Feed just the header (incomplete frame)
        codec.feed(&data[..3]);

        // Should not have a complete frame yet (not even header complete)
        assert!(codec.decode_next().unwrap().is_none());

        // Feed the rest
        codec.feed(&data[3..]);

        // Now we should get both frames
        let decoded1 = codec.decode_next().unwrap().unwrap();
        let decoded2 = codec.decode_next().unwrap().unwrap();

        assert_eq!(frame1, decoded1);
        assert_eq!(frame2, decoded2);

        // No more frames
        assert!(codec.decode_next().unwrap().is_none());
    }

    #[test]
    fn test_frame_type_categories() {
        assert!(FrameType::Hello.is_control());
        assert!(FrameType::LoginAttempt.is_control());
        assert!(!FrameType::ChatSend.is_control());

        assert!(FrameType::EnterRoom.is_room_command());
        assert!(FrameType::ChatSend.is_room_command());
        assert!(!FrameType::ChatMessage.is_room_command());

        assert!(FrameType::ChatMessage.is_room_event());
        assert!(FrameType::RoomList.is_room_event());
        assert!(!FrameType::ChatSend.is_room_event());
    }

    #[test]
    fn test_empty_frame() {
        let frame = Frame::empty(FrameType::Goodbye);
        assert!(frame.payload.is_empty());
        assert_eq!(frame.encoded_size(), FRAME_HEADER_SIZE);

        let encoded = frame.encode_to_bytes();
        let decoded = Frame::decode_complete(&encoded).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn test_invalid_frame_type() {
        let mut data = BytesMut::new();
        data.put_u8(0xFE); // Invalid type
        data.put_u32(0);

        let result = Frame::decode_complete(&data);
        assert!(result.is_err());
    }

    #[test]
    fn test_frame_too_large() {
        let mut data = BytesMut::new();
        data.put_u8(FrameType::ChatSend as u8);
        data.put_u32((MAX_FRAME_SIZE + 1) as u32);

        let result = Frame::decode_complete(&data);
        assert!(result.is_err());
    }
}
