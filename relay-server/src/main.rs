//! Relay chat server.
//!
//! Usage: relay-server [--port=8081] [--clients=10] [--channels=1]
//!                     [--secret=...] [--debug]
//!
//! Clients connect over WebSocket; --secret sets the admin secret new
//! connections may present to gain admin rights.

use std::process;

use tracing_subscriber::EnvFilter;

use relay_server::{Server, ServerBuilder};

fn usage() -> ! {
    eprintln!("Relay chat server");
    eprintln!("=================");
    eprintln!("relay-server [--port=8081] [--clients=10] [--channels=1] [--secret=...] [--debug]");
    process::exit(1);
}

fn main() {
    let mut builder = ServerBuilder::new();
    let mut debug = false;

    for arg in std::env::args().skip(1) {
        if arg == "--debug" {
            debug = true;
            builder = builder.debug(true);
        } else if arg == "--help" || arg == "-h" {
            usage();
        } else if let Some(port) = arg.strip_prefix("--port=") {
            match port.parse::<u16>() {
                Ok(port) => builder = builder.port(port),
                Err(_) => {
                    eprintln!("Invalid argument: {arg}");
                    usage();
                }
            }
        } else if let Some(max) = arg.strip_prefix("--clients=") {
            match max.parse::<usize>() {
                Ok(max) => builder = builder.max_clients(max),
                Err(_) => {
                    eprintln!("Invalid argument: {arg}");
                    usage();
                }
            }
        } else if let Some(max) = arg.strip_prefix("--channels=") {
            match max.parse::<usize>() {
                Ok(max) => builder = builder.max_channels(max),
                Err(_) => {
                    eprintln!("Invalid argument: {arg}");
                    usage();
                }
            }
        } else if let Some(secret) = arg.strip_prefix("--secret=") {
            builder = builder.admin_secret(secret);
        } else {
            eprintln!("Invalid argument: {arg}");
            usage();
        }
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let server = match Server::new(builder.build()) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("failed to start server: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        eprintln!("server stopped: {e}");
        process::exit(1);
    }
}
