//! HTTP protocol implementation.
//!
//! This module implements an HTTP/1.1 server that answers exactly one request
//! per connection and then closes it.
//!
//! # Architecture
//!
//! - **`connection`**: Per-connection state machine, run in its own task
//! - **`parser`**: Reads a request line, headers and a sized body from a stream
//! - **`request`**: Parsed request representation
//! - **`env`**: Rack-style environment built from a request
//! - **`response`**: Response representation with builder pattern
//! - **`body`**: Buffered bodies and the single-slot streaming hand-off
//! - **`writer`**: Serializes a response, buffered or chunked
//! - **`status`**: Reason phrase table
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Parsing   │ ← Read request line, headers, body
//!        └──────┬──────┘
//!               │ Request parsed          malformed → 400 ─┐
//!               ▼                                          │
//!        ┌──────────────────┐                              │
//!        │   Dispatching    │ ← Call the application       │
//!        └──────┬───────────┘   (error or panic → 500)     │
//!               │ Response ready                           │
//!               ▼                                          │
//!        ┌──────────────────┐                              │
//!        │    Writing       │ ◄────────────────────────────┘
//!        └──────┬───────────┘
//!               │ Response sent
//!               ▼
//!            Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rackhouse::app::Application;
//! use rackhouse::http::{connection::Connection, response::Response};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app: Arc<dyn Application> = Arc::new(|_env| Ok(Response::ok("hi\n")));
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let app = Arc::clone(&app);
//!         tokio::spawn(async move {
//!             if let Err(e) = Connection::new(socket, app).run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod body;
pub mod connection;
pub mod env;
pub mod parser;
pub mod request;
pub mod response;
pub mod status;
pub mod writer;
