//! Request/response envelope exchanged with the REST backend
//!
//! The core depends only on this shape. How an envelope travels (HTTP
//! verbs, JSON framing, websockets in tests) is the transport's business.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
}

/// A request the gateway hands to the transport.
///
/// `url` is relative to the configured base URL; the gateway prefixes it
/// and injects the session token into `query` before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub url: String,
    pub method: Method,
    #[serde(default)]
    pub query: Vec<(String, String)>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl Request {
    /// A GET request for `url` with no query and no body.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            query: Vec::new(),
            body: None,
        }
    }

    /// A POST request for `url` carrying `body`.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Append a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// Response envelope status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseCode {
    Ok,
    AuthRequired,
    Error,
}

/// A response as delivered by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub code: ResponseCode,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl Response {
    /// A successful response carrying `payload`.
    pub fn ok(payload: Value) -> Self {
        Self {
            code: ResponseCode::Ok,
            payload,
            messages: Vec::new(),
        }
    }

    /// An authentication challenge.
    pub fn auth_required() -> Self {
        Self {
            code: ResponseCode::AuthRequired,
            payload: Value::Null,
            messages: Vec::new(),
        }
    }

    /// A failure response with a single message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: ResponseCode::Error,
            payload: Value::Null,
            messages: vec![message.into()],
        }
    }

    /// All messages joined for error reporting.
    pub fn message(&self) -> String {
        if self.messages.is_empty() {
            "(no message)".to_string()
        } else {
            self.messages.join("; ")
        }
    }
}
