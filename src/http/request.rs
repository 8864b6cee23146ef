use bytes::Bytes;

/// Header name plus the value split into whitespace-separated tokens.
pub type HeaderField = (String, Vec<String>);

/// Represents a parsed HTTP request from a client.
///
/// Built once by the parser and owned by the connection that read it. Header
/// names keep the case they arrived with and duplicates are kept in arrival
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The method token exactly as received (e.g. "GET")
    pub method: String,
    /// The raw request-target, including any `?query` (e.g. "/search?q=1")
    pub target: String,
    /// HTTP version token (typically "HTTP/1.1")
    pub version: String,
    /// Request headers in arrival order
    pub headers: Vec<HeaderField>,
    /// Request body, present only when a content length was declared
    pub body: Option<Bytes>,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<String>,
    target: Option<String>,
    version: Option<String>,
    headers: Vec<HeaderField>,
    body: Option<Bytes>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            target: None,
            version: None,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Appends a header, tokenizing the value the same way the parser does.
    pub fn header(mut self, name: impl Into<String>, value: &str) -> Self {
        self.headers.push((name.into(), tokenize(value)));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            target: self.target.ok_or("target missing")?,
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            headers: self.headers,
            body: self.body,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Returns the tokens of the last header named `name`, compared ASCII
    /// case-insensitively.
    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers
            .iter()
            .rev()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, tokens)| tokens.as_slice())
    }

    /// Splits the target on the first `?` into path and query.
    ///
    /// The query is empty when the target carries none.
    pub fn path_and_query(&self) -> (&str, &str) {
        self.target.split_once('?').unwrap_or((&self.target, ""))
    }
}

/// Splits a raw header value into its whitespace-separated tokens.
pub fn tokenize(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}
