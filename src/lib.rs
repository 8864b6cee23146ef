//! Rackhouse - one request per connection HTTP/1.1 server
//!
//! Core library: request parsing, the request environment, the response
//! writer and the accept loop, plus a small routing application.

pub mod app;
pub mod config;
pub mod http;
pub mod server;
