//! Controller transport: request/response fetches and the server-sent event stream.
//!
//! The panel never talks HTTP directly. It depends on the two capabilities
//! below so tests can script replies without a controller on the network.

#![allow(missing_docs)]

pub mod curl;
pub mod sse;

use std::fmt;

use serde_json::Value;

use crate::core::errors::SpkError;

pub use self::curl::CurlTransport;
pub use self::sse::{SseEvent, SseParser};

/// HTTP verb used by the controller API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One controller request. `path` is appended verbatim to the configured host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Response body: JSON when it parses, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
}

impl Body {
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).map_or_else(|_| Self::Text(raw.to_string()), Self::Json)
    }

    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Text(_) => None,
        }
    }

    /// `status` field of an object reply, if any.
    pub fn status_field(&self) -> Option<&str> {
        self.as_json()?.get("status")?.as_str()
    }

    /// `msg` field of an object reply, if any.
    pub fn msg_field(&self) -> Option<&str> {
        self.as_json()?.get("msg")?.as_str()
    }

    /// Compact single-line rendering used by status areas.
    pub fn compact(&self) -> String {
        match self {
            Self::Json(v) => v.to_string(),
            Self::Text(t) => t.clone(),
        }
    }
}

/// Network or HTTP-level failure. `code` is `None` when no response arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub code: Option<u16>,
    pub text: String,
}

impl TransportError {
    pub fn unreachable(text: impl Into<String>) -> Self {
        Self {
            code: None,
            text: text.into(),
        }
    }

    pub fn http(code: u16) -> Self {
        Self {
            code: Some(code),
            text: reason_phrase(code).to_string(),
        }
    }

    /// Code as shown on the status line; `0` when there was no response.
    pub fn code_label(&self) -> String {
        self.code.unwrap_or(0).to_string()
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "HTTP {code} {}", self.text),
            None => write!(f, "{}", self.text),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<TransportError> for SpkError {
    fn from(value: TransportError) -> Self {
        Self::Transport {
            code: value.code,
            text: value.text,
        }
    }
}

pub type FetchResult = Result<Body, TransportError>;

/// Issue one request and return the decoded body.
pub trait FetchResource: Send + Sync {
    fn fetch(&self, request: &Request) -> FetchResult;
}

/// Something arriving on an event subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Event(SseEvent),
    /// The stream broke or could not be opened.
    Failed(TransportError),
}

/// Callback fed from the subscription's reader thread.
pub type EventSink = Box<dyn FnMut(StreamItem) + Send>;

/// Open a long-lived event subscription.
pub trait SubscribeEvents: Send + Sync {
    fn subscribe(&self, path: &str, sink: EventSink) -> Result<Subscription, TransportError>;
}

/// Both capabilities, as the panel runtime needs them.
pub trait Transport: FetchResource + SubscribeEvents {}

impl<T: FetchResource + SubscribeEvents> Transport for T {}

/// Live subscription. Closing (or dropping) it stops event delivery.
pub struct Subscription {
    closer: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(closer: impl FnOnce() + Send + 'static) -> Self {
        Self {
            closer: Some(Box::new(closer)),
        }
    }

    /// Idempotent.
    pub fn close(&mut self) {
        if let Some(closer) = self.closer.take() {
            closer();
        }
    }

    pub const fn is_open(&self) -> bool {
        self.closer.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("open", &self.is_open())
            .finish()
    }
}

/// Reason phrase for the status codes a small HTTP server actually sends.
pub const fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}
