//! Attempt executor over `reqwest`.

use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde_json::{json, Value};

use super::sse::{SseDecodeError, SseDecoder, SseEvent};
use super::{envelope_error, AttemptExecutor, UpstreamReply, UpstreamRequest};
use crate::retry::AttemptError;

/// Executes attempts against the real upstream. Each attempt builds its own
/// client with pooling disabled, so no connection is reused after a failed
/// or half-read attempt and everything is released when the attempt ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpExecutor;

impl HttpExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AttemptExecutor for HttpExecutor {
    async fn execute(&self, request: &UpstreamRequest) -> Result<UpstreamReply, AttemptError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .connect_timeout(request.connect_timeout)
            .build()
            .map_err(|e| AttemptError::Other(format!("building HTTP client: {}", e)))?;

        let builder = client
            .post(&request.url)
            .bearer_auth(request.credential.expose())
            .header("HTTP-Referer", &request.referer)
            .header("X-Title", &request.title)
            .json(&request.body);
        // Streams have no total deadline; the same budget bounds the wait for
        // headers and every gap between body chunks instead.
        let response = if request.stream {
            tokio::time::timeout(request.request_timeout, builder.send())
                .await
                .map_err(|_| stalled(request.request_timeout))??
        } else {
            builder.timeout(request.request_timeout).send().await?
        };
        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!("reading body of HTTP {} reply: {}", status.as_u16(), e);
                    String::new()
                }
            };
            return Err(AttemptError::from_status(status.as_u16(), &body));
        }

        if request.stream {
            read_event_stream(response.bytes_stream(), request.request_timeout).await
        } else {
            read_json(response).await
        }
    }
}

async fn read_json(response: reqwest::Response) -> Result<UpstreamReply, AttemptError> {
    let text = response.text().await?;
    let value = match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(_) => json!({ "text": text }),
    };
    if let Some(err) = envelope_error(&value) {
        return Err(err);
    }
    Ok(UpstreamReply::Complete(value))
}

fn stalled(idle: Duration) -> AttemptError {
    AttemptError::Timeout(format!("no data from upstream for {}s", idle.as_secs_f64()))
}

fn corrupted(e: SseDecodeError) -> AttemptError {
    AttemptError::Connection(format!("corrupted stream: {}", e))
}

/// Buffer an event stream up to `[DONE]`. Waiting longer than `idle` for the
/// next chunk fails the attempt.
async fn read_event_stream<S, B, E>(body: S, idle: Duration) -> Result<UpstreamReply, AttemptError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = SseDecoder::new();
    let mut chunks = Vec::new();

    loop {
        let next = tokio::time::timeout(idle, body.next())
            .await
            .map_err(|_| stalled(idle))?;
        let Some(bytes) = next else { break };
        let bytes = bytes.map_err(|e| AttemptError::Connection(format!("stream interrupted: {}", e)))?;
        let events = decoder.push(bytes.as_ref()).map_err(corrupted)?;
        if collect(events, &mut chunks)? {
            return Ok(UpstreamReply::Streamed(chunks));
        }
    }
    let events = decoder.finish().map_err(corrupted)?;
    if collect(events, &mut chunks)? || !chunks.is_empty() {
        return Ok(UpstreamReply::Streamed(chunks));
    }
    Err(AttemptError::Connection(
        "stream ended before any data".to_string(),
    ))
}

/// Append data chunks; returns true once `[DONE]` was seen.
fn collect(events: Vec<SseEvent>, chunks: &mut Vec<Value>) -> Result<bool, AttemptError> {
    for event in events {
        match event {
            SseEvent::Done => return Ok(true),
            SseEvent::Data(value) => {
                if let Some(err) = envelope_error(&value) {
                    return Err(err);
                }
                chunks.push(value);
            }
        }
    }
    Ok(false)
}
