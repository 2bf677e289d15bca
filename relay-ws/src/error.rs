//! Error types for relay-ws.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WsError>;

#[derive(Error, Debug)]
pub enum WsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("handshake failed: {0}")]
    Handshake(String),
}

impl WsError {
    pub fn handshake(reason: impl Into<String>) -> Self {
        Self::Handshake(reason.into())
    }

    /// Whether the peer is gone, as opposed to a transient failure.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed
                | Self::WebSocket(
                    tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed
                )
        )
    }
}
