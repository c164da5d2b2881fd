//! Event sink that writes retry progress to stderr, keeping stdout for the reply.

use async_trait::async_trait;
use orr_core::notify::{EventKind, EventSink, NotificationEvent, SinkError};

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

#[async_trait]
impl EventSink for ConsoleSink {
    async fn emit(&self, event: NotificationEvent) -> Result<(), SinkError> {
        if let Some(line) = format_event(&event) {
            eprintln!("{}", line);
        }
        Ok(())
    }
}

/// One console line per event; hidden status lines print nothing.
pub fn format_event(event: &NotificationEvent) -> Option<String> {
    let severity = event.severity.as_str();
    match event.kind {
        EventKind::Status if event.hidden => None,
        EventKind::Status => Some(format!("  .. {}", event.text)),
        EventKind::Notification => Some(match &event.title {
            Some(title) => format!("[{}] {}: {}", severity, title, event.text),
            None => format!("[{}] {}", severity, event.text),
        }),
        EventKind::Message => Some(format!("[{}] {}", severity, event.text)),
    }
}
