//! Rack-style request environment.
//!
//! Every request is flattened into a single-valued string map before it reaches
//! the application. Fixed server fields sit next to the request line fields, and
//! each header appears as `HTTP_<NAME>`, except `CONTENT_TYPE` and
//! `CONTENT_LENGTH`, which are stored without the prefix.

use std::collections::HashMap;

use bytes::Bytes;

use crate::http::request::Request;

pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
pub const SCRIPT_NAME: &str = "SCRIPT_NAME";
pub const PATH_INFO: &str = "PATH_INFO";
pub const QUERY_STRING: &str = "QUERY_STRING";
pub const SERVER_NAME: &str = "SERVER_NAME";
pub const SERVER_PROTOCOL: &str = "SERVER_PROTOCOL";
pub const SERVER_PORT: &str = "SERVER_PORT";
pub const CONTENT_TYPE: &str = "CONTENT_TYPE";
pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";
pub const HEADER_PREFIX: &str = "HTTP_";

/// Normalized view of one request, consumed once by the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: HashMap<String, String>,
    input: Bytes,
}

impl Environment {
    /// Builds the environment for `request`.
    ///
    /// When a header name occurs more than once, the last occurrence wins.
    pub fn from_request(request: Request) -> Self {
        let mut vars = HashMap::new();
        let (path, query) = request.path_and_query();

        vars.insert(REQUEST_METHOD.to_string(), request.method.to_uppercase());
        vars.insert(SCRIPT_NAME.to_string(), String::new());
        vars.insert(PATH_INFO.to_string(), path.to_string());
        vars.insert(QUERY_STRING.to_string(), query.to_string());
        vars.insert(SERVER_NAME.to_string(), "localhost".to_string());
        vars.insert(SERVER_PROTOCOL.to_string(), request.version.clone());
        vars.insert(SERVER_PORT.to_string(), "80".to_string());

        for (name, tokens) in &request.headers {
            vars.insert(env_key(name), tokens.join(" "));
        }

        Self {
            vars,
            input: request.body.unwrap_or_default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// The request body, empty when none was declared.
    pub fn input(&self) -> &Bytes {
        &self.input
    }

    pub fn method(&self) -> &str {
        self.get(REQUEST_METHOD).unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.get(PATH_INFO).unwrap_or_default()
    }

    pub fn query(&self) -> &str {
        self.get(QUERY_STRING).unwrap_or_default()
    }
}

/// Maps a header name to its environment key.
///
/// ```
/// # use rackhouse::http::env::env_key;
/// assert_eq!(env_key("Content-Type"), "CONTENT_TYPE");
/// assert_eq!(env_key("X-Request-Id"), "HTTP_X_REQUEST_ID");
/// ```
pub fn env_key(header_name: &str) -> String {
    let name = header_name.to_uppercase().replace('-', "_");

    if name == CONTENT_TYPE || name == CONTENT_LENGTH {
        name
    } else {
        format!("{HEADER_PREFIX}{name}")
    }
}
