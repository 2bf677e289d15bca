//! Connection smoke test.
//!
//! Usage: relay-probe [url] [message]
//!
//! Connects to the server, sends one text message, and prints whatever
//! comes back. The connection closes when the stream goes out of scope.

use relay_ws::{WsPayload, WsStream};

const DEFAULT_URL: &str = "ws://127.0.0.1:8081";
const DEFAULT_MESSAGE: &str = "Hello World!";

fn main() -> relay_ws::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let url = args.get(1).map(String::as_str).unwrap_or(DEFAULT_URL);
    let message = args.get(2).map(String::as_str).unwrap_or(DEFAULT_MESSAGE);

    let mut stream = WsStream::connect(url)?;
    stream.send_text(message)?;

    match stream.recv()? {
        WsPayload::Text(text) => println!("{text}"),
        WsPayload::Binary(data) => println!("{}", String::from_utf8_lossy(&data)),
    }

    Ok(())
}
