//! Accept loop and connection threads.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use relay_proto::{PacketKind, Response};
use relay_ws::{WsListener, WsStream};

use crate::client::ClientHandle;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::protocol::Context;

/// Connection thread tick interval while idle.
const TICK: Duration = Duration::from_millis(5);

/// The relay server.
///
/// One thread per connection: each connection thread polls its socket,
/// dispatches complete frames, and drains the client's outbound queue
/// (direct replies and channel broadcasts alike) onto the socket.
pub struct Server {
    listener: WsListener,
    ctx: Arc<Context>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Result<Self> {
        let listener = WsListener::bind(config.bind_addr.as_str())?;
        info!("listening on {}", listener.local_addr()?);
        info!(
            "capacity: {} clients, {} channels",
            config.max_clients, config.max_channels
        );

        Ok(Self {
            listener,
            ctx: Arc::new(Context::new(config)),
        })
    }

    /// The bound address, useful when binding to an ephemeral port.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the listener fails.
    pub fn run(&self) -> Result<()> {
        loop {
            let mut stream = match self.listener.accept() {
                Ok(stream) => stream,
                Err(e) => {
                    error!("accept failed: {e}");
                    continue;
                }
            };

            if !self.ctx.clients.has_capacity() {
                warn!("server capacity is full, rejecting connection");
                let reject = Response::failure(PacketKind::SvrConnect, "server is full");
                let _ = stream.send_binary(&reject.encode());
                let _ = stream.flush();
                continue;
            }

            let client = self.ctx.clients.add();
            let ctx = Arc::clone(&self.ctx);
            thread::spawn(move || service_connection(ctx, client, stream));
        }
    }
}

/// Drive one connection until the peer goes away.
fn service_connection(ctx: Arc<Context>, client: Arc<ClientHandle>, mut stream: WsStream) {
    if let Err(e) = stream.set_nonblocking(true) {
        error!("failed to set nonblocking: {e}");
        ctx.disconnect(&client);
        return;
    }
    debug!("servicing client {}", client.id);

    loop {
        let mut frames: Vec<Vec<u8>> = Vec::new();
        stream.poll(|bytes| frames.push(bytes.to_vec()));

        for frame in frames {
            let reply = ctx.handle_frame(&client, &frame);
            client.push_packet(reply.encode());
        }

        for frame in client.drain_outbound() {
            if stream.send_binary(&frame).is_err() {
                break;
            }
        }
        let _ = stream.flush();

        if !stream.is_open() {
            break;
        }
        thread::sleep(TICK);
    }

    ctx.disconnect(&client);
}
