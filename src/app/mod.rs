//! Application boundary
//!
//! An application turns a request environment into a response. One instance
//! is built at startup and shared by every connection through an `Arc`, so it
//! must be `Send + Sync`: anything that cannot be shared across connection
//! tasks is rejected at compile time.

pub mod manifest;
pub mod router;

pub use manifest::{Manifest, ManifestError};
pub use router::{Reply, RouteRequest, Router};

use crate::http::env::Environment;
use crate::http::response::Response;

/// A request handler shared read-only by all connections.
///
/// `call` may fail with any error or even panic; the connection turns either
/// into a 500 response.
pub trait Application: Send + Sync + 'static {
    fn call(&self, env: Environment) -> anyhow::Result<Response>;
}

impl<F> Application for F
where
    F: Fn(Environment) -> anyhow::Result<Response> + Send + Sync + 'static,
{
    fn call(&self, env: Environment) -> anyhow::Result<Response> {
        self(env)
    }
}
