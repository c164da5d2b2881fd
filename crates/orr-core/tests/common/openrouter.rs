//! Fake OpenRouter endpoint and fast-retry configs for integration tests.
//!
//! Everything runs in real time, so every pause is configured to zero.

use orr_core::config::{OrrConfig, RetryConfig};
use orr_core::notify::{ChannelSink, EventKind, EventSink, NotificationEvent, Severity};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use wiremock::MockServer;

pub const COMPLETIONS_PATH: &str = "/api/v1/chat/completions";

pub async fn start() -> MockServer {
    MockServer::start().await
}

/// Config pointing at `server` with a `{per_burst, bursts, cycles}` schedule
/// and no waiting anywhere.
pub fn config(server: &MockServer, per_burst: u32, bursts: u32, cycles: u32) -> OrrConfig {
    let mut cfg = OrrConfig::default();
    cfg.upstream.base_url = format!("{}/api/v1", server.uri());
    cfg.upstream.api_key = "test-key".to_string();
    cfg.retry = RetryConfig {
        attempts_per_burst: per_burst,
        attempt_delay_min: 0.0,
        attempt_delay_max: 0.0,
        bursts_before_long_pause: bursts,
        burst_pause_min: 0.0,
        burst_pause_max: 0.0,
        cycles,
        long_pause: 0.0,
        ..RetryConfig::default()
    };
    cfg
}

pub fn completion(text: &str) -> Value {
    json!({
        "id": "gen-1",
        "model": "openai/gpt-4o",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
    })
}

pub fn rate_limited() -> Value {
    json!({"error": {"code": 429, "message": "Rate limit exceeded"}})
}

/// SSE body: one `data:` event per chunk, keep-alive comments in between,
/// optionally terminated by `[DONE]`.
pub fn sse(chunks: &[Value], done: bool) -> String {
    let mut body = String::from(": OPENROUTER PROCESSING\n\n");
    for chunk in chunks {
        body.push_str(&format!("data: {}\n\n", chunk));
        body.push_str(": OPENROUTER PROCESSING\n\n");
    }
    if done {
        body.push_str("data: [DONE]\n\n");
    }
    body
}

pub fn delta(text: &str) -> Value {
    json!({"choices": [{"index": 0, "delta": {"content": text}}]})
}

pub fn sink() -> (Arc<dyn EventSink>, mpsc::Receiver<NotificationEvent>) {
    let (sink, rx) = ChannelSink::channel(1024);
    (Arc::new(sink), rx)
}

pub fn drain(rx: &mut mpsc::Receiver<NotificationEvent>) -> Vec<NotificationEvent> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    events
}

/// Toast notifications of one severity.
pub fn toasts(events: &[NotificationEvent], severity: Severity) -> usize {
    events
        .iter()
        .filter(|e| e.kind == EventKind::Notification && e.severity == severity)
        .count()
}
