//! Route table application
//!
//! Handlers are ordinary closures registered once at startup against a method
//! and an exact path. After startup the table is only read, so it is shared
//! between connections like any other application.

use std::collections::HashMap;
use std::future::Future;

use bytes::Bytes;
use tracing::debug;

use crate::app::Application;
use crate::http::body::{Body, BodyWriter};
use crate::http::env::{CONTENT_LENGTH, CONTENT_TYPE, Environment, HEADER_PREFIX};
use crate::http::response::Response;

type Handler = Box<dyn Fn(&RouteRequest) -> anyhow::Result<Reply> + Send + Sync>;

/// What a handler hands back.
pub enum Reply {
    /// A 200 with a single-chunk body.
    Text(String),
    /// A 200 streamed as `text/event-stream` with chunked encoding.
    Stream(Body),
    /// A fully specified response, passed through untouched.
    Response(Response),
}

impl Reply {
    pub fn into_response(self) -> Response {
        match self {
            Reply::Text(text) => Response::ok(text),
            Reply::Stream(body) => Response::new(
                200,
                vec![
                    ("Transfer-Encoding".to_string(), "chunked".to_string()),
                    ("Content-Type".to_string(), "text/event-stream".to_string()),
                ],
                body,
            ),
            Reply::Response(response) => response,
        }
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}

/// Builds a streaming reply whose chunks come from `producer`.
///
/// ```ignore
/// router.get("/ticks", |_| {
///     Ok(stream(|mut out| async move {
///         for i in 0..3 {
///             out.write(format!("data: {i}\n\n")).await?;
///         }
///         anyhow::Ok(())
///     }))
/// });
/// ```
pub fn stream<F, Fut>(producer: F) -> Reply
where
    F: FnOnce(BodyWriter) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Reply::Stream(Body::stream(producer))
}

/// The request as a handler sees it.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    /// Header names lower-cased and dashed, e.g. `content-type`, `x-foo`
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl RouteRequest {
    /// Rebuilds handler-facing request data from the environment.
    pub fn from_env(env: &Environment) -> Self {
        let headers = env
            .iter()
            .filter_map(|(key, value)| {
                let name = if key == CONTENT_TYPE || key == CONTENT_LENGTH {
                    key
                } else {
                    key.strip_prefix(HEADER_PREFIX)?
                };
                Some((name.to_lowercase().replace('_', "-"), value.to_string()))
            })
            .collect();

        Self {
            method: env.method().to_string(),
            path: env.path().to_string(),
            query: env.query().to_string(),
            headers,
            body: env.input().clone(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Decoded `application/x-www-form-urlencoded` pairs from the query string.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .into_owned()
            .collect()
    }

    /// First decoded query value for `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Dispatches on method and exact path.
#[derive(Default)]
pub struct Router {
    routes: HashMap<(String, String), Handler>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` and `path`, replacing any earlier one.
    pub fn route<H, R>(mut self, method: &str, path: impl Into<String>, handler: H) -> Self
    where
        H: Fn(&RouteRequest) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        let handler: Handler = Box::new(move |req: &RouteRequest| handler(req).map(Into::into));
        self.routes
            .insert((method.to_ascii_uppercase(), path.into()), handler);
        self
    }

    pub fn get<H, R>(self, path: impl Into<String>, handler: H) -> Self
    where
        H: Fn(&RouteRequest) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route("GET", path, handler)
    }

    pub fn post<H, R>(self, path: impl Into<String>, handler: H) -> Self
    where
        H: Fn(&RouteRequest) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route("POST", path, handler)
    }

    pub fn put<H, R>(self, path: impl Into<String>, handler: H) -> Self
    where
        H: Fn(&RouteRequest) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route("PUT", path, handler)
    }

    pub fn delete<H, R>(self, path: impl Into<String>, handler: H) -> Self
    where
        H: Fn(&RouteRequest) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route("DELETE", path, handler)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Application for Router {
    fn call(&self, env: Environment) -> anyhow::Result<Response> {
        let key = (env.method().to_string(), env.path().to_string());

        let Some(handler) = self.routes.get(&key) else {
            debug!(method = %key.0, path = %key.1, "No route matched");
            return Ok(Response::not_found());
        };

        let request = RouteRequest::from_env(&env);
        Ok(handler(&request)?.into_response())
    }
}
