//! Progress events for the host UI.
//!
//! The scheduler reports every transition (attempt start/result, pauses,
//! final success or failure) through a `Notifier`. Delivery goes to an
//! injected `EventSink`; without one, events only reach the log.

mod notifier;
mod sink;

pub use notifier::Notifier;
pub use sink::{ChannelSink, EventSink, NoopSink, SinkError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Kind of host event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Status line under the chat message.
    Status,
    /// Toast notification.
    Notification,
    /// Message event in the chat itself.
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// One event for the host. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub severity: Severity,
    pub text: String,
    /// Toast title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Status lines: the host marks the line finished.
    pub done: bool,
    /// Status lines: hide instead of show.
    pub hidden: bool,
    /// Toasts: auto-dismiss after this long.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Structured payload for rich rendering (e.g. `retry_info`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    /// Messages: host event name, e.g. `chat:message:error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    fn new(kind: EventKind, severity: Severity, text: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            text: text.into(),
            title: None,
            done: false,
            hidden: false,
            timeout: None,
            meta: None,
            event_name: None,
            timestamp: Utc::now(),
        }
    }

    pub fn status(severity: Severity, text: impl Into<String>, done: bool) -> Self {
        Self {
            done,
            ..Self::new(EventKind::Status, severity, text)
        }
    }

    pub fn notification(severity: Severity, text: impl Into<String>) -> Self {
        Self::new(EventKind::Notification, severity, text)
    }

    pub fn message(event_name: impl Into<String>, text: impl Into<String>, meta: Value) -> Self {
        Self {
            event_name: Some(event_name.into()),
            meta: Some(meta),
            ..Self::new(EventKind::Message, Severity::Error, text)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Event in the `{"type": ..., "data": {...}}` shape chat hosts consume.
    pub fn to_host_json(&self) -> Value {
        match self.kind {
            EventKind::Status => json!({
                "type": "status",
                "data": {
                    "description": self.text,
                    "done": self.done,
                    "hidden": self.hidden,
                }
            }),
            EventKind::Notification => json!({
                "type": "notification",
                "data": {
                    "type": self.severity.as_str(),
                    "title": self.title.as_deref().unwrap_or("OpenRouter"),
                    "content": self.text,
                    "timeout": self.timeout.map(|t| t.as_secs_f64()),
                    "meta": self.meta.clone().unwrap_or_else(|| json!({})),
                    "timestamp": self.timestamp.to_rfc3339(),
                }
            }),
            EventKind::Message => json!({
                "type": self.event_name.as_deref().unwrap_or("message"),
                "data": self.meta.clone().unwrap_or_else(|| json!({ "content": self.text })),
            }),
        }
    }
}
