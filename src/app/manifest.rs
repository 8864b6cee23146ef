//! YAML entry point for the bundled application.
//!
//! The file lists static routes. It is read once at startup and turned into a
//! [`Router`]; nothing re-reads it afterwards.
//!
//! ```yaml
//! routes:
//!   - path: /
//!     body: "hello world\n"
//!   - path: /ticks
//!     headers:
//!       Content-Type: text/event-stream
//!     stream: ["data: 1\n\n", "data: 2\n\n"]
//! ```

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::app::router::{Reply, Router};
use crate::http::body::Body;
use crate::http::response::{Headers, Response};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("route {path}: {reason}")]
    InvalidRoute { path: String, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteSpec {
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    #[serde(default = "default_status")]
    pub status: u16,
    /// Written in file order.
    #[serde(default)]
    pub headers: serde_yaml::Mapping,
    pub body: Option<String>,
    /// How many times `body` is repeated.
    #[serde(default = "default_repeat")]
    pub repeat: usize,
    /// Chunks sent one by one with chunked encoding.
    pub stream: Option<Vec<String>>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_status() -> u16 {
    200
}

fn default_repeat() -> usize {
    1
}

impl Manifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let manifest = Self::parse(&text)?;
        info!(
            path = %path.display(),
            routes = manifest.routes.len(),
            "Loaded application manifest"
        );
        Ok(manifest)
    }

    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Builds the route table. Every route is validated up front.
    pub fn into_router(self) -> Result<Router, ManifestError> {
        let mut router = Router::new();

        for spec in self.routes {
            let method = spec.method.clone();
            let path = spec.path.clone();
            let route = StaticRoute::try_from(spec)?;

            router = router.route(&method, path, move |_| Ok(route.reply()));
        }

        Ok(router)
    }
}

/// A validated route whose response is rebuilt for every request.
struct StaticRoute {
    status: u16,
    headers: Headers,
    content: Content,
}

enum Content {
    Full(Bytes),
    Stream(Vec<Bytes>),
}

impl StaticRoute {
    fn reply(&self) -> Reply {
        let body = match &self.content {
            Content::Full(bytes) => Body::full(bytes.clone()),
            Content::Stream(chunks) => {
                let chunks = chunks.clone();
                Body::stream(move |mut out| async move {
                    for chunk in chunks {
                        out.write(chunk).await?;
                    }
                    anyhow::Ok(())
                })
            }
        };

        Reply::Response(Response::new(self.status, self.headers.clone(), body))
    }
}

impl TryFrom<RouteSpec> for StaticRoute {
    type Error = ManifestError;

    fn try_from(spec: RouteSpec) -> Result<Self, Self::Error> {
        let invalid = |reason: &str| ManifestError::InvalidRoute {
            path: spec.path.clone(),
            reason: reason.to_string(),
        };

        if !spec.path.starts_with('/') {
            return Err(invalid("path must start with '/'"));
        }
        if spec.method.is_empty() || spec.method.contains(char::is_whitespace) {
            return Err(invalid("method must be a single token"));
        }

        let mut headers = Vec::with_capacity(spec.headers.len() + 1);
        for (name, value) in &spec.headers {
            let (Some(name), Some(value)) = (scalar(name), scalar(value)) else {
                return Err(invalid("header names and values must be scalars"));
            };
            headers.push((name, value));
        }

        let content = match (&spec.body, &spec.stream) {
            (Some(_), Some(_)) => return Err(invalid("body and stream are exclusive")),
            (Some(body), None) => {
                let fits = body
                    .len()
                    .checked_mul(spec.repeat)
                    .is_some_and(|len| len <= isize::MAX as usize);
                if !fits {
                    return Err(invalid("repeated body is too large"));
                }
                Content::Full(Bytes::from(body.repeat(spec.repeat)))
            }
            (None, Some(chunks)) => {
                let chunked = headers.iter().any(|(k, v)| {
                    k.eq_ignore_ascii_case("Transfer-Encoding") && v.eq_ignore_ascii_case("chunked")
                });
                if !chunked {
                    headers.push(("Transfer-Encoding".to_string(), "chunked".to_string()));
                }
                Content::Stream(chunks.iter().cloned().map(Bytes::from).collect())
            }
            (None, None) => Content::Full(Bytes::new()),
        };

        Ok(Self {
            status: spec.status,
            headers,
            content,
        })
    }
}

fn scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
