//! Response payloads as seen by the page and as stored in caches.

use serde::{Deserialize, Serialize};

/// A response body with status line and headers.
///
/// The same shape is returned from the network, stored in a cache, and
/// synthesized when neither can answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ResponsePayload {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ResponsePayload {
    /// Build a response with the given status and body and no headers.
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self { status, status_text: status_text.into(), headers: Vec::new(), body: body.into() }
    }

    /// Synthesized 503 returned when neither network nor cache can answer.
    pub fn service_unavailable(message: &str) -> Self {
        Self {
            status: 503,
            status_text: "Service Unavailable".into(),
            headers: vec![("content-type".into(), "text/plain; charset=utf-8".into())],
            body: message.as_bytes().to_vec(),
        }
    }

    /// True for 2xx statuses, the only responses worth caching.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
