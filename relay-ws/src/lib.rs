//! # relay-ws
//!
//! Blocking WebSocket transport for the relay chat system.
//!
//! All WebSocket mechanics (handshake, framing, masking, ping/pong, close)
//! are consumed from `tungstenite`; this crate only wraps them in the
//! blocking client / polling server shapes the relay binaries need.
//!
//! ## Example
//!
//! ```rust,ignore
//! use relay_ws::{WsListener, WsStream};
//!
//! // Server accepts connections
//! let listener = WsListener::bind("127.0.0.1:8081")?;
//! let mut peer = listener.accept()?;
//!
//! // Client connects, sends, waits for one reply
//! let mut stream = WsStream::connect("ws://127.0.0.1:8081")?;
//! stream.send_text("Hello World!")?;
//! let reply = stream.recv()?;
//! ```

mod error;
mod listener;
mod stream;

pub use error::{Result, WsError};
pub use listener::WsListener;
pub use stream::{WsPayload, WsStream};
