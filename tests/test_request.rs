use rackhouse::http::request::{Request, RequestBuilder, tokenize};

fn request(target: &str) -> Request {
    RequestBuilder::new()
        .method("GET")
        .target(target)
        .build()
        .unwrap()
}

#[test]
fn test_request_header_retrieval() {
    let req = RequestBuilder::new()
        .method("GET")
        .target("/")
        .header("Host", "example.com")
        .header("Content-Type", "application/json")
        .build()
        .unwrap();

    assert_eq!(req.header("Host").unwrap(), ["example.com"]);
    assert_eq!(req.header("content-type").unwrap(), ["application/json"]);
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_header_last_duplicate_wins() {
    let req = RequestBuilder::new()
        .method("GET")
        .target("/")
        .header("X-Id", "1")
        .header("X-Id", "2")
        .build()
        .unwrap();

    assert_eq!(req.header("X-Id").unwrap(), ["2"]);
    assert_eq!(req.headers.len(), 2);
}

#[test]
fn test_request_path_and_query() {
    assert_eq!(request("/search?q=1").path_and_query(), ("/search", "q=1"));
    assert_eq!(request("/plain").path_and_query(), ("/plain", ""));
    assert_eq!(request("/a?b?c").path_and_query(), ("/a", "b?c"));
}

#[test]
fn test_request_builder_defaults() {
    let req = request("/");

    assert_eq!(req.version, "HTTP/1.1");
    assert!(req.headers.is_empty());
    assert!(req.body.is_none());
}

#[test]
fn test_request_builder_requires_method_and_target() {
    assert!(RequestBuilder::new().target("/").build().is_err());
    assert!(RequestBuilder::new().method("GET").build().is_err());
}

#[test]
fn test_tokenize_splits_on_any_whitespace() {
    assert_eq!(tokenize(" a \t b  c "), ["a", "b", "c"]);
    assert!(tokenize("   ").is_empty());
}
