//! # relay-proto
//!
//! Wire protocol types for the relay chat system.
//!
//! This crate provides the binary packet layer shared by the server and
//! client binaries:
//!
//! - [`PacketKind`]: request/response discriminator
//! - [`FrameHeader`]: 12-byte frame header
//! - [`Request`] / [`Response`]: frame codecs
//! - payload codecs for the channel operations
//!
//! ## Frame layout
//!
//! All integers are little-endian. A complete frame is:
//!
//! ```text
//! Offset  Size  Field
//! 0       4     len        (= 8 + payload_len + 2)
//! 4       4     id         (i32, -1 on failure responses)
//! 8       4     kind       (see PacketKind)
//! 12      n     payload
//! 12+n    2     terminator (two NUL bytes)
//! ```

mod frame;
mod kind;
mod payload;

pub use frame::{FrameHeader, Request, Response, FRAME_OVERHEAD, HEADER_SIZE};
pub use kind::PacketKind;
pub use payload::{
    encode_channel_list, BroadcastPayload, ChannelInfo, ChannelView, ConnectPayload,
    CreatePayload, JoinPayload, MessagePayload, TargetPayload, UpdateField, UpdatePayload,
};

/// Request id carried by failure responses.
pub const FAILURE_ID: i32 = -1;
