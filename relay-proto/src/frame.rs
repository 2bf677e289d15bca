//! Frame header and request/response codecs.

use bytemuck::{Pod, Zeroable};

use crate::kind::PacketKind;
use crate::FAILURE_ID;

/// Frame header size in bytes (len + id + kind).
pub const HEADER_SIZE: usize = 12;

/// Bytes a frame carries besides its payload and the len prefix:
/// id (4) + kind (4) + terminator (2). The `len` field of a frame is
/// `payload_len + FRAME_OVERHEAD`.
pub const FRAME_OVERHEAD: usize = 10;

/// Two NUL bytes closing every frame.
const TERMINATOR: [u8; 2] = [0x00, 0x00];

/// Frame header (12 bytes).
///
/// Layout:
/// ```text
/// Offset  Size  Field
/// 0       4     len
/// 4       4     id
/// 8       4     kind
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FrameHeader {
    /// Remaining frame length after this field (id + kind + payload + terminator)
    pub len: u32,
    /// Request id (-1 on failure responses)
    pub id: i32,
    /// Packet kind (see [`PacketKind`])
    pub kind: u32,
}

impl FrameHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = HEADER_SIZE;

    #[inline]
    pub fn new(id: i32, kind: PacketKind, payload_len: usize) -> Self {
        Self {
            len: (payload_len + FRAME_OVERHEAD) as u32,
            id,
            kind: kind as u32,
        }
    }

    /// Serialize header to bytes.
    #[inline]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.len.to_le_bytes());
        buf[4..8].copy_from_slice(&self.id.to_le_bytes());
        buf[8..12].copy_from_slice(&self.kind.to_le_bytes());
        buf
    }

    /// Parse header from bytes.
    ///
    /// Returns `None` if the buffer is too small.
    #[inline]
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            len: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            id: i32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            kind: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
        })
    }
}

/// An incoming request.
///
/// The kind is kept raw so unknown values can be answered with an error
/// response instead of failing decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: i32,
    pub kind: u32,
    pub payload: Vec<u8>,
}

impl Request {
    pub fn new(id: i32, kind: PacketKind, payload: Vec<u8>) -> Self {
        Self {
            id,
            kind: kind as u32,
            payload,
        }
    }

    /// Packet kind, if the raw value is a known one.
    #[inline]
    pub fn packet_kind(&self) -> Option<PacketKind> {
        PacketKind::try_from(self.kind).ok()
    }

    /// Decode a frame body: the frame with its 4-byte len prefix stripped,
    /// `[id][kind][payload][00 00]`.
    pub fn from_body(body: &[u8]) -> Option<Self> {
        if body.len() < FRAME_OVERHEAD {
            return None;
        }
        let id = i32::from_le_bytes([body[0], body[1], body[2], body[3]]);
        let kind = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
        let payload = body[8..body.len() - TERMINATOR.len()].to_vec();
        Some(Self { id, kind, payload })
    }

    /// Decode a complete frame, validating the len prefix.
    pub fn from_frame(frame: &[u8]) -> Option<Self> {
        let header = FrameHeader::from_bytes(frame)?;
        let len = header.len as usize;
        if len < FRAME_OVERHEAD || frame.len() < 4 + len {
            return None;
        }
        Some(Self {
            id: header.id,
            kind: header.kind,
            payload: frame[HEADER_SIZE..4 + len - TERMINATOR.len()].to_vec(),
        })
    }

    /// Encode into a complete frame.
    pub fn encode(&self) -> Vec<u8> {
        encode_frame(self.id, self.kind, &self.payload)
    }
}

/// An outgoing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub id: i32,
    pub kind: PacketKind,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn new(id: i32, kind: PacketKind, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            kind,
            payload: payload.into(),
        }
    }

    /// Response without a payload.
    pub fn empty(id: i32, kind: PacketKind) -> Self {
        Self::new(id, kind, Vec::new())
    }

    /// Failure response: id -1 with a human-readable reason.
    pub fn failure(kind: PacketKind, reason: impl Into<String>) -> Self {
        Self::new(FAILURE_ID, kind, reason.into().into_bytes())
    }

    /// Encode into a complete frame.
    pub fn encode(&self) -> Vec<u8> {
        encode_frame(self.id, self.kind as u32, &self.payload)
    }

    /// Decode a complete frame.
    ///
    /// Returns `None` on truncated input or an unknown kind.
    pub fn from_frame(frame: &[u8]) -> Option<Self> {
        let request = Request::from_frame(frame)?;
        Some(Self {
            id: request.id,
            kind: request.packet_kind()?,
            payload: request.payload,
        })
    }
}

fn encode_frame(id: i32, kind: u32, payload: &[u8]) -> Vec<u8> {
    let len = payload.len() + FRAME_OVERHEAD;
    let mut buf = Vec::with_capacity(4 + len);
    buf.extend_from_slice(&(len as u32).to_le_bytes());
    buf.extend_from_slice(&id.to_le_bytes());
    buf.extend_from_slice(&kind.to_le_bytes());
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&TERMINATOR);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(std::mem::size_of::<FrameHeader>(), HEADER_SIZE);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = FrameHeader::new(42, PacketKind::ChMessage, 100);
        let bytes = header.to_bytes();
        let parsed = FrameHeader::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.len, 110);
        assert_eq!(parsed.id, 42);
        assert_eq!(parsed.kind, PacketKind::ChMessage as u32);
    }

    #[test]
    fn test_request_from_body() {
        // id 1, kind 0x16 (ChList), payload "bn", terminator
        let body = [
            0x01, 0x00, 0x00, 0x00, 0x16, 0x00, 0x00, 0x00, b'b', b'n', b'u', b'y',
        ];
        let request = Request::from_body(&body).unwrap();
        assert_eq!(request.id, 1);
        assert_eq!(request.kind, 22);
        assert_eq!(request.payload, b"bn");
    }

    #[test]
    fn test_frame_roundtrip() {
        let request = Request::new(7, PacketKind::ChJoin, vec![4, 0, 0, 0]);
        let frame = request.encode();

        assert_eq!(frame.len(), 4 + 4 + FRAME_OVERHEAD);
        assert_eq!(&frame[frame.len() - 2..], &[0, 0]);

        let decoded = Request::from_frame(&frame).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_response_roundtrip() {
        let response = Response::failure(PacketKind::NotFound, "Channel not found.");
        let frame = response.encode();
        let decoded = Response::from_frame(&frame).unwrap();

        assert_eq!(decoded.id, FAILURE_ID);
        assert_eq!(decoded.kind, PacketKind::NotFound);
        assert_eq!(decoded.payload, b"Channel not found.");
    }

    #[test]
    fn test_truncated_frames() {
        assert!(Request::from_frame(&[]).is_none());
        assert!(Request::from_frame(&[0x0A, 0x00]).is_none());
        assert!(Request::from_body(&[1, 2, 3]).is_none());

        // len field claims more bytes than the buffer holds
        let mut frame = Request::new(1, PacketKind::Heartbeat, Vec::new()).encode();
        frame[0] = 0xFF;
        assert!(Request::from_frame(&frame).is_none());
    }

    #[test]
    fn test_unknown_kind_decodes_as_request_only() {
        let frame = encode_frame(3, 0xAB, b"payload");
        let request = Request::from_frame(&frame).unwrap();
        assert_eq!(request.packet_kind(), None);
        assert!(Response::from_frame(&frame).is_none());
    }
}
