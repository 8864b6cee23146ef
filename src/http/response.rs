use crate::http::body::Body;

/// Ordered response headers. Written exactly as given, duplicates included.
pub type Headers = Vec<(String, String)>;

/// Represents a complete HTTP response produced by an application.
///
/// The writer picks the wire encoding from the headers: a
/// `Transfer-Encoding: chunked` header selects chunked mode, anything else is
/// written with a `Content-Length`.
#[derive(Debug)]
pub struct Response {
    /// The numeric status code, conventionally 100 to 599
    pub status: u16,
    /// Headers in the order they should be written
    pub headers: Headers,
    /// Response body, buffered or streaming
    pub body: Body,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(200)
///     .header("Content-Type", "text/plain")
///     .body("hello\n")
///     .build();
/// ```
pub struct ResponseBuilder {
    status: u16,
    headers: Headers,
    body: Body,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::empty(),
        }
    }

    /// Appends a header. Earlier headers with the same name are kept.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    pub fn new(status: u16, headers: Headers, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Creates a 200 OK response with a single-chunk body.
    pub fn ok(body: impl Into<Body>) -> Self {
        ResponseBuilder::new(200).body(body).build()
    }

    /// Creates a 200 OK chunked response whose body comes from a producer.
    pub fn chunked(body: Body) -> Self {
        ResponseBuilder::new(200)
            .header("Transfer-Encoding", "chunked")
            .body(body)
            .build()
    }

    /// Creates a 400 Bad Request response.
    pub fn bad_request() -> Self {
        ResponseBuilder::new(400)
            .header("Content-Type", "text/plain")
            .body("Bad Request\n")
            .build()
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        ResponseBuilder::new(404)
            .header("Content-Type", "text/plain")
            .body("Not Found\n")
            .build()
    }

    /// The fixed response sent when the application fails.
    pub fn internal_error() -> Self {
        ResponseBuilder::new(500)
            .header("Content-Type", "text/plain")
            .body("Error\n")
            .build()
    }

    /// Returns the value of the first header named `key`, compared ASCII
    /// case-insensitively.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the headers ask for chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        self.headers.iter().any(|(k, v)| {
            k.eq_ignore_ascii_case("Transfer-Encoding") && v.trim().eq_ignore_ascii_case("chunked")
        })
    }
}
