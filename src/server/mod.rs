//! Listening socket and accept loop

pub mod listener;

pub use listener::{Accept, Listener, run, serve_on};
