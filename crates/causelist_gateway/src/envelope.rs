use std::fmt;

use bytes::Bytes;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// The only inbound headers that survive forwarding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ForwardHeaders {
    pub authorization: Option<String>,
    /// Only honoured for POST.
    pub content_type: Option<String>,
}

impl ForwardHeaders {
    pub fn bearer(token: &str) -> Self {
        Self {
            authorization: Some(format!("Bearer {token}")),
            content_type: None,
        }
    }
}

/// One inbound call, reduced to what the upstream sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    pub method: Method,
    pub path_segments: Vec<String>,
    /// Raw query string without the leading `?`; `None` when the caller sent none.
    pub query: Option<String>,
    pub headers: ForwardHeaders,
    /// `None` means no body at all, which is distinct from an empty one.
    pub body: Option<Bytes>,
}

impl RequestEnvelope {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::Get,
            path_segments: split_path(path),
            query: None,
            headers: ForwardHeaders::default(),
            body: None,
        }
    }

    pub fn post(path: &str) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(path)
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_headers(mut self, headers: ForwardHeaders) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.headers.content_type = Some(content_type.to_string());
        self.body = Some(body.into());
        self
    }

    /// `"/" + segments.join("/")`, verbatim.
    pub fn upstream_path(&self) -> String {
        format!("/{}", self.path_segments.join("/"))
    }

    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.upstream_path(), query),
            None => self.upstream_path(),
        }
    }
}

fn split_path(path: &str) -> Vec<String> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    trimmed.split('/').map(ToOwned::to_owned).collect()
}

/// What the gateway hands back: upstream status and JSON body, relayed as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub body: Value,
}

impl ResponseEnvelope {
    /// The one response the gateway makes up itself: no upstream answer was obtained.
    pub fn network_failure(message: impl fmt::Display) -> Self {
        Self {
            status: 500,
            body: json!({ "error": message.to_string() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
