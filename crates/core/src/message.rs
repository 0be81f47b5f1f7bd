//! Request and response snapshots exchanged between the engine, the store
//! and the network.

use bytes::Bytes;
use url::Url;

/// An outgoing request as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method, uppercase.
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self { method: "GET".to_string(), url, headers: Vec::new() }
    }

    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url, headers: Vec::new() }
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Request path without query or fragment.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Same request, different URL. Method and headers are kept.
    pub fn with_url(&self, url: Url) -> Self {
        Self { method: self.method.clone(), url, headers: self.headers.clone() }
    }
}

/// A full response snapshot: status, headers and body.
///
/// Cloning is cheap; the body is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Approximate bytes this snapshot occupies in storage.
    pub fn stored_size(&self) -> u64 {
        let headers: usize = self.headers.iter().map(|(k, v)| k.len() + v.len()).sum();
        (self.body.len() + headers) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_method_normalized() {
        let req = Request::new("post", Url::parse("https://example.com/a").unwrap());
        assert_eq!(req.method, "POST");
        assert!(!req.is_get());
        assert!(Request::get(Url::parse("https://example.com/").unwrap()).is_get());
    }

    #[test]
    fn test_response_header_lookup() {
        let resp = Response::new(200, "ok").with_header("Content-Type", "text/plain");
        assert_eq!(resp.header("content-type"), Some("text/plain"));
        assert_eq!(resp.header("etag"), None);
    }

    #[test]
    fn test_response_success_range() {
        assert!(Response::new(200, "").is_success());
        assert!(Response::new(204, "").is_success());
        assert!(!Response::new(304, "").is_success());
        assert!(!Response::new(503, "").is_success());
    }
}
