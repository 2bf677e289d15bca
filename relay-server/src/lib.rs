//! # relay-server
//!
//! Relay chat server. Clients connect over WebSocket, pick a username, and
//! exchange messages inside capacity-bounded channels with moderator and
//! admin roles.
//!
//! ## Example
//!
//! ```rust,ignore
//! use relay_server::{Server, ServerBuilder};
//!
//! let config = ServerBuilder::new()
//!     .port(8081)
//!     .max_clients(100)
//!     .admin_secret("hunter2")
//!     .build();
//!
//! Server::new(config)?.run()?;
//! ```

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

// Re-exports
pub use channel::{Channel, ChannelRegistry, JoinOutcome, ModerationOutcome};
pub use client::{ClientHandle, ClientRegistry};
pub use config::{ServerBuilder, ServerConfig};
pub use error::{RelayError, Result};
pub use protocol::Context;
pub use server::Server;
