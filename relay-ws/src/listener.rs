//! WebSocket listener for the server side.

use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

use tracing::debug;

use crate::error::{Result, WsError};
use crate::stream::WsStream;

/// Accepts TCP connections and runs the server-side WebSocket handshake.
pub struct WsListener {
    listener: TcpListener,
}

impl WsListener {
    /// Bind to an address. Bind to port 0 for an ephemeral port.
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener })
    }

    /// The bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Block until the next client connects and completes the handshake.
    pub fn accept(&self) -> Result<WsStream> {
        let (stream, peer) = self.listener.accept()?;
        let ws = tungstenite::accept(stream).map_err(|e| WsError::handshake(e.to_string()))?;
        debug!(%peer, "websocket accepted");
        Ok(WsStream::from_accepted(ws))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::WsPayload;
    use std::thread;

    #[test]
    fn test_loopback_echo() {
        let listener = WsListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let mut peer = listener.accept().unwrap();
            let payload = peer.recv().unwrap();
            peer.send_binary(payload.as_bytes()).unwrap();
            // connection closes when peer drops
        });

        let mut stream = WsStream::connect(&format!("ws://{addr}")).unwrap();
        stream.send_text("Hello World!").unwrap();
        let reply = stream.recv().unwrap();
        assert_eq!(reply, WsPayload::Binary(b"Hello World!".to_vec()));

        server.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        // port 9 on loopback should refuse; failure is ConnectionError-kind
        let result = WsStream::connect("ws://127.0.0.1:9");
        assert!(result.is_err());
    }

    #[test]
    fn test_recv_after_peer_close() {
        let listener = WsListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let mut peer = listener.accept().unwrap();
            peer.close().unwrap();
        });

        let mut stream = WsStream::connect(&format!("ws://{addr}")).unwrap();
        let err = stream.recv().unwrap_err();
        assert!(err.is_closed());

        server.join().unwrap();
    }
}
