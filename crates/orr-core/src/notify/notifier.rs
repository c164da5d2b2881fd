use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::{EventKind, EventSink, NotificationEvent, Severity};
use crate::config::{NotificationConfig, RetryConfig};

/// Best-effort event dispatch. Never fails and never waits longer than the
/// dispatch timeout for a slow sink.
#[derive(Clone)]
pub struct Notifier {
    sink: Option<Arc<dyn EventSink>>,
    enabled: bool,
    in_chat_errors: bool,
    in_chat_event_name: String,
    dispatch_timeout: Duration,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("has_sink", &self.sink.is_some())
            .field("enabled", &self.enabled)
            .field("in_chat_errors", &self.in_chat_errors)
            .field("in_chat_event_name", &self.in_chat_event_name)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .finish()
    }
}

impl Notifier {
    pub fn new(
        sink: Option<Arc<dyn EventSink>>,
        retry: &RetryConfig,
        cfg: &NotificationConfig,
    ) -> Self {
        Self {
            sink,
            enabled: retry.notifications_enabled,
            in_chat_errors: retry.in_chat_errors_enabled,
            in_chat_event_name: cfg.in_chat_event_name.clone(),
            dispatch_timeout: cfg.dispatch_timeout(),
        }
    }

    /// Notifier without a sink: events are only logged.
    pub fn log_only() -> Self {
        Self::new(None, &RetryConfig::default(), &NotificationConfig::default())
    }

    fn allows(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Message => self.in_chat_errors,
            EventKind::Status | EventKind::Notification => self.enabled,
        }
    }

    /// Dispatch one event to the sink, or to the log if there is none.
    pub async fn emit(&self, event: NotificationEvent) {
        let sink = match &self.sink {
            Some(sink) if self.allows(event.kind) => sink,
            _ => {
                tracing::debug!(
                    kind = ?event.kind,
                    severity = event.severity.as_str(),
                    "event: {}",
                    event.text
                );
                return;
            }
        };
        match tokio::time::timeout(self.dispatch_timeout, sink.emit(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("dropping event: {}", e),
            Err(_) => tracing::debug!(
                "dropping event: sink did not accept it within {:?}",
                self.dispatch_timeout
            ),
        }
    }

    pub async fn status(&self, severity: Severity, text: impl Into<String>, done: bool) {
        self.emit(NotificationEvent::status(severity, text, done))
            .await;
    }

    pub async fn toast(&self, severity: Severity, text: impl Into<String>) {
        self.emit(NotificationEvent::notification(severity, text))
            .await;
    }

    /// In-chat error box for a final failure; `error` is the `{"message": ...}` object.
    pub async fn in_chat_error(&self, error: &Value) {
        let text = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("OpenRouter request failed")
            .to_string();
        let event = NotificationEvent::message(
            self.in_chat_event_name.clone(),
            text,
            json!({ "error": error }),
        );
        self.emit(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{ChannelSink, SinkError};
    use async_trait::async_trait;

    struct StuckSink;

    #[async_trait]
    impl EventSink for StuckSink {
        async fn emit(&self, _event: NotificationEvent) -> Result<(), SinkError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl EventSink for FailingSink {
        async fn emit(&self, _event: NotificationEvent) -> Result<(), SinkError> {
            Err(SinkError("host gone".into()))
        }
    }

    fn notifier(sink: Arc<dyn EventSink>, retry: RetryConfig) -> Notifier {
        Notifier::new(Some(sink), &retry, &NotificationConfig::default())
    }

    #[tokio::test]
    async fn delivers_to_channel() {
        let (sink, mut rx) = ChannelSink::channel(8);
        let n = notifier(Arc::new(sink), RetryConfig::default());
        n.toast(Severity::Warning, "retrying").await;
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::Notification);
        assert_eq!(ev.severity, Severity::Warning);
        assert_eq!(ev.text, "retrying");
    }

    #[tokio::test]
    async fn absent_sink_is_a_no_op() {
        Notifier::log_only()
            .status(Severity::Info, "nothing listens", false)
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_sink_is_bounded() {
        let n = notifier(Arc::new(StuckSink), RetryConfig::default());
        let start = tokio::time::Instant::now();
        n.toast(Severity::Info, "hello").await;
        assert!(start.elapsed() <= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn failing_sink_is_swallowed() {
        let n = notifier(Arc::new(FailingSink), RetryConfig::default());
        n.toast(Severity::Error, "ignored").await;
    }

    #[tokio::test]
    async fn disabled_notifications_still_allow_in_chat_errors() {
        let (sink, mut rx) = ChannelSink::channel(8);
        let retry = RetryConfig {
            notifications_enabled: false,
            ..RetryConfig::default()
        };
        let n = notifier(Arc::new(sink), retry);
        n.toast(Severity::Error, "suppressed").await;
        n.status(Severity::Info, "suppressed", true).await;
        n.in_chat_error(&json!({"message": "Max retry attempts (3) exceeded"}))
            .await;
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::Message);
        assert_eq!(ev.event_name.as_deref(), Some("chat:message:error"));
        assert_eq!(ev.text, "Max retry attempts (3) exceeded");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn in_chat_errors_can_be_disabled() {
        let (sink, mut rx) = ChannelSink::channel(8);
        let retry = RetryConfig {
            in_chat_errors_enabled: false,
            ..RetryConfig::default()
        };
        let n = notifier(Arc::new(sink), retry);
        n.in_chat_error(&json!({"message": "x"})).await;
        assert!(rx.try_recv().is_err());
    }
}
