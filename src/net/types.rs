//! Request descriptors and raw responses exchanged with a [`Transport`].
//!
//! [`Transport`]: super::transport::Transport

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

pub const AUTHORIZATION: &str = "Authorization";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound call as built by an API wrapper.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the configured base URL, or an absolute URL.
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

impl RequestDescriptor {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), headers: BTreeMap::new(), body: None, query: Vec::new() }
    }

    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    #[must_use]
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    #[must_use]
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body. A value that fails to serialize is logged and the
    /// request goes out without a body.
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => self.body = Some(value),
            Err(e) => {
                tracing::warn!(method = %self.method, url = %self.url, error = %e, "request body failed to serialize; sending none");
                self.body = None;
            }
        }
        self
    }

    /// Header lookup, ignoring ASCII case as HTTP does.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as seen by the classifier: status plus undecoded body text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self { status, body: body.to_string() }
    }

    /// Body as JSON. Empty bodies read as `null`; non-JSON text becomes a
    /// JSON string so callers still get the raw payload.
    #[must_use]
    pub fn json_body(&self) -> Value {
        let trimmed = self.body.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(self.body.clone()))
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
