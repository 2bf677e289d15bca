//! WebSocket stream, both the connecting and the accepted side.

use std::io;
use std::net::TcpStream;

use tracing::debug;
use tungstenite::protocol::WebSocket;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::Message;

use crate::error::{Result, WsError};

/// A received application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsPayload {
    Text(String),
    Binary(Vec<u8>),
}

impl WsPayload {
    /// Message bytes regardless of the frame type.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(data) => data,
        }
    }
}

/// WebSocket stream - handles both client and server connections.
///
/// The stream is a scoped resource: dropping it closes the connection,
/// on the success path and on every failure path alike.
pub enum WsStream {
    /// Connecting side (may have TLS)
    Client {
        ws: WebSocket<MaybeTlsStream<TcpStream>>,
        closed: bool,
    },
    /// Accepted side (plain TCP)
    Server {
        ws: WebSocket<TcpStream>,
        closed: bool,
    },
}

impl WsStream {
    /// Connect to a WebSocket server.
    ///
    /// Blocks until the handshake completes; fails if the endpoint is
    /// unreachable or refuses the handshake.
    pub fn connect(url: &str) -> Result<Self> {
        let (ws, _response) = tungstenite::connect(url)?;
        debug!(url, "websocket connected");
        Ok(Self::Client { ws, closed: false })
    }

    /// Wrap a server-accepted socket.
    pub(crate) fn from_accepted(ws: WebSocket<TcpStream>) -> Self {
        Self::Server { ws, closed: false }
    }

    /// Set blocking mode on the underlying socket.
    pub fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        match self {
            Self::Client { ws, .. } => {
                if let MaybeTlsStream::Plain(ref stream) = ws.get_ref() {
                    stream.set_nonblocking(nonblocking)?;
                }
            }
            Self::Server { ws, .. } => {
                ws.get_ref().set_nonblocking(nonblocking)?;
            }
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        match self {
            Self::Client { closed, .. } => *closed,
            Self::Server { closed, .. } => *closed,
        }
    }

    fn set_closed(&mut self) {
        match self {
            Self::Client { closed, .. } => *closed = true,
            Self::Server { closed, .. } => *closed = true,
        }
    }

    fn can_write(&self) -> bool {
        match self {
            Self::Client { ws, .. } => ws.can_write(),
            Self::Server { ws, .. } => ws.can_write(),
        }
    }

    fn read_message(&mut self) -> std::result::Result<Message, tungstenite::Error> {
        match self {
            Self::Client { ws, .. } => ws.read(),
            Self::Server { ws, .. } => ws.read(),
        }
    }

    fn send_message(&mut self, msg: Message) -> Result<()> {
        if self.is_closed() {
            return Err(WsError::ConnectionClosed);
        }
        let result = match self {
            Self::Client { ws, .. } => ws.send(msg),
            Self::Server { ws, .. } => ws.send(msg),
        };
        match result {
            Ok(()) => Ok(()),
            // Frame queued, socket not writable yet; flushed on a later call.
            Err(tungstenite::Error::Io(ref e)) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                self.set_closed();
                Err(WsError::ConnectionClosed)
            }
            Err(e) => {
                self.set_closed();
                Err(e.into())
            }
        }
    }

    /// Send a text message.
    pub fn send_text(&mut self, text: &str) -> Result<()> {
        self.send_message(Message::Text(text.to_string()))
    }

    /// Send a binary message.
    pub fn send_binary(&mut self, data: &[u8]) -> Result<()> {
        self.send_message(Message::Binary(data.to_vec()))
    }

    /// Block until the next Text or Binary message arrives.
    ///
    /// Pings are answered transparently (tungstenite queues the pong on
    /// read). Fails with [`WsError::ConnectionClosed`] when the peer closes
    /// before a message arrives.
    pub fn recv(&mut self) -> Result<WsPayload> {
        loop {
            if self.is_closed() {
                return Err(WsError::ConnectionClosed);
            }
            match self.read_message() {
                Ok(Message::Text(text)) => return Ok(WsPayload::Text(text)),
                Ok(Message::Binary(data)) => return Ok(WsPayload::Binary(data)),
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Ok(Message::Close(_)) => {
                    self.set_closed();
                    return Err(WsError::ConnectionClosed);
                }
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    self.set_closed();
                    return Err(WsError::ConnectionClosed);
                }
                Err(e) => {
                    self.set_closed();
                    return Err(e.into());
                }
            }
        }
    }

    /// Drain pending messages without blocking, invoking the handler with
    /// the bytes of each Text or Binary message. Returns the count drained.
    ///
    /// The socket must be in non-blocking mode.
    pub fn poll<F: FnMut(&[u8])>(&mut self, mut handler: F) -> usize {
        if self.is_closed() {
            return 0;
        }

        let mut count = 0;
        loop {
            match self.read_message() {
                Ok(Message::Binary(data)) => {
                    handler(&data);
                    count += 1;
                }
                Ok(Message::Text(text)) => {
                    handler(text.as_bytes());
                    count += 1;
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Ok(Message::Close(_)) => {
                    self.set_closed();
                    break;
                }
                Err(tungstenite::Error::Io(ref e)) if e.kind() == io::ErrorKind::WouldBlock => {
                    break;
                }
                Err(_) => {
                    self.set_closed();
                    break;
                }
            }
        }
        count
    }

    /// Flush pending frames.
    pub fn flush(&mut self) -> Result<()> {
        let result = match self {
            Self::Client { ws, .. } => ws.flush(),
            Self::Server { ws, .. } => ws.flush(),
        };
        match result {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(tungstenite::Error::Io(ref e)) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if the connection is open.
    pub fn is_open(&self) -> bool {
        !self.is_closed() && self.can_write()
    }

    /// Close the connection. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if !self.is_closed() {
            let _ = match self {
                Self::Client { ws, .. } => ws.close(None),
                Self::Server { ws, .. } => ws.close(None),
            };
            let _ = self.flush();
            self.set_closed();
        }
        Ok(())
    }
}

impl Drop for WsStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
