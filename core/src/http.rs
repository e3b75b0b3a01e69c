//! HTTP call descriptors shared between the bridge and an engine.
//!
//! # Design
//! These types describe one inbound call and its buffered reply as plain
//! data. The server crate builds a `RequestScope` from the framework request
//! and turns an `HttpResponse` back into a framework response; the core never
//! touches the network itself.
//!
//! Header names and values are kept as raw bytes so values that are not
//! valid UTF-8 survive the round-trip untouched.

use serde::{Deserialize, Serialize};

/// One `(name, value)` header pair as raw bytes.
pub type HeaderPair = (Vec<u8>, Vec<u8>);

/// Immutable description of one inbound HTTP call.
///
/// Header names are lower-cased on construction; order is preserved, and
/// repeated names stay as separate pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestScope {
    #[serde(rename = "type")]
    kind: String,
    method: String,
    path: String,
    query_string: Vec<u8>,
    headers: Vec<HeaderPair>,
}

impl RequestScope {
    pub fn new<I, N, V>(method: &str, path: &str, query_string: &[u8], headers: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_ascii_lowercase(), value.as_ref().to_vec()))
            .collect();
        Self {
            kind: "http".to_string(),
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            query_string: query_string.to_vec(),
            headers,
        }
    }

    /// Always `"http"`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_string(&self) -> &[u8] {
        &self.query_string
    }

    pub fn headers(&self) -> &[HeaderPair] {
        &self.headers
    }

    /// First value for `name` (case-insensitive), if it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.as_bytes();
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| std::str::from_utf8(v).ok())
    }
}

/// A buffered HTTP response assembled from an engine's messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<HeaderPair>,
    pub body: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_lowercases_header_names_and_keeps_order() {
        let scope = RequestScope::new(
            "post",
            "/mcp",
            b"a=1",
            [("Content-Type", "application/json"), ("X-Trace", "1"), ("x-trace", "2")],
        );
        assert_eq!(scope.kind(), "http");
        assert_eq!(scope.method(), "POST");
        assert_eq!(scope.query_string(), b"a=1");
        let names: Vec<&[u8]> = scope.headers().iter().map(|(n, _)| n.as_slice()).collect();
        assert_eq!(names, vec![&b"content-type"[..], b"x-trace", b"x-trace"]);
    }

    #[test]
    fn header_lookup_returns_first_match() {
        let scope = RequestScope::new("GET", "/mcp", b"", [("Accept", "a"), ("accept", "b")]);
        assert_eq!(scope.header("ACCEPT"), Some("a"));
        assert_eq!(scope.header("origin"), None);
    }

    #[test]
    fn scope_serializes_type_tag() {
        let scope = RequestScope::new("GET", "/mcp", b"", Vec::<(&str, &str)>::new());
        let json = serde_json::to_value(&scope).unwrap();
        assert_eq!(json["type"], "http");
        assert_eq!(json["method"], "GET");
    }
}
