//! Upstream chat-completion calls.
//!
//! One `AttemptExecutor::execute` call is one attempt: a fresh HTTP client,
//! one POST, and the full reply (or the classified failure). Streaming replies
//! are read to the end inside the attempt so a stream that breaks halfway is
//! retried as a whole and never reaches the caller in pieces.

mod http;
mod sse;

pub use http::HttpExecutor;
pub use sse::{SseDecodeError, SseDecoder, SseEvent};

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::retry::AttemptError;

/// Bearer credential. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Everything needed to repeat the same upstream call on every attempt.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: String,
    pub credential: Credential,
    /// JSON body, forwarded as-is.
    pub body: Value,
    pub stream: bool,
    pub referer: String,
    pub title: String,
    /// Total timeout; applied to non-streaming calls only.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl UpstreamRequest {
    pub fn new(cfg: &UpstreamConfig, credential: Credential, body: Value, stream: bool) -> Self {
        Self {
            url: cfg.completions_url(),
            credential,
            body,
            stream,
            referer: cfg.referer.clone(),
            title: cfg.title.clone(),
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
        }
    }
}

/// Successful upstream reply.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamReply {
    /// Non-streaming JSON body.
    Complete(Value),
    /// Every `data:` chunk of a completed event stream, in order.
    Streamed(Vec<Value>),
}

/// Performs one upstream attempt.
#[async_trait]
pub trait AttemptExecutor: Send + Sync {
    async fn execute(&self, request: &UpstreamRequest) -> Result<UpstreamReply, AttemptError>;
}

/// Failure carried inside a successful reply or an SSE chunk:
/// `{"error": {"code": 429, "message": "..."}}`.
pub fn envelope_error(value: &Value) -> Option<AttemptError> {
    let err = value.get("error")?;
    if err.is_null() {
        return None;
    }
    let code = err.get("code").and_then(|c| match c {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    });
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| err.as_str())
        .unwrap_or("Unknown error")
        .to_string();
    Some(AttemptError::Envelope {
        code: code.and_then(|c| u16::try_from(c).ok()),
        message,
    })
}
