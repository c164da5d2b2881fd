//! Turns a session outcome into the payload handed back to the caller.

use serde_json::{json, Value};
use std::time::Duration;

use crate::retry::{format_elapsed, Outcome};
use crate::upstream::UpstreamReply;

/// Key under which retry metadata is attached to replies and failures.
pub const RETRY_INFO: &str = "retry_info";

/// What the caller receives.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// Single JSON object (non-streaming reply, or any failure of a
    /// non-streaming request).
    Json(Value),
    /// Ordered event-stream chunks; a terminal `[DONE]` is implied.
    EventStream(Vec<Value>),
}

impl ResponsePayload {
    /// True when the payload carries an `error` object.
    pub fn is_error(&self) -> bool {
        match self {
            ResponsePayload::Json(v) => v.get("error").is_some_and(|e| !e.is_null()),
            ResponsePayload::EventStream(chunks) => chunks
                .iter()
                .any(|c| c.get("error").is_some_and(|e| !e.is_null())),
        }
    }

    /// Render as server-sent event lines, ending with `data: [DONE]`.
    pub fn to_sse_lines(&self) -> Vec<String> {
        let chunks: Vec<&Value> = match self {
            ResponsePayload::Json(v) => vec![v],
            ResponsePayload::EventStream(chunks) => chunks.iter().collect(),
        };
        chunks
            .into_iter()
            .map(|c| format!("data: {}\n\n", c))
            .chain(std::iter::once("data: [DONE]\n\n".to_string()))
            .collect()
    }
}

/// Compose the caller-facing payload.
///
/// Successful replies are passed through untouched after a first-attempt
/// success; after retries they gain `retry_info: {attempts, elapsed}` (on the
/// final chunk when streaming). Failures become an error object that lists
/// every failed attempt.
pub fn compose(outcome: Outcome, streaming: bool) -> ResponsePayload {
    if let Some(body) = failure_body(&outcome) {
        return if streaming {
            ResponsePayload::EventStream(vec![body])
        } else {
            ResponsePayload::Json(body)
        };
    }
    let Outcome::Success {
        reply,
        attempts_used,
        elapsed,
        ..
    } = outcome
    else {
        // failure_body covers every other variant
        return ResponsePayload::Json(Value::Null);
    };
    let annotation = (attempts_used > 1).then(|| success_annotation(attempts_used, elapsed));

    match reply {
        UpstreamReply::Complete(mut body) => {
            if let (Some(info), Some(obj)) = (annotation, body.as_object_mut()) {
                obj.insert(RETRY_INFO.to_string(), info);
            }
            ResponsePayload::Json(body)
        }
        UpstreamReply::Streamed(mut chunks) => {
            if let Some(info) = annotation {
                match chunks.last_mut().and_then(Value::as_object_mut) {
                    Some(last) => {
                        last.insert(RETRY_INFO.to_string(), info);
                    }
                    None => chunks.push(json!({ RETRY_INFO: info })),
                }
            }
            ResponsePayload::EventStream(chunks)
        }
    }
}

/// `{attempts, elapsed}` attached to a reply that needed retries.
pub fn success_annotation(attempts: u32, elapsed: Duration) -> Value {
    json!({
        "attempts": attempts,
        "elapsed": format_elapsed(elapsed),
    })
}

/// `{"error": {"message"}, "retry_info": {...}}` for failed outcomes.
pub fn failure_body(outcome: &Outcome) -> Option<Value> {
    let message = match outcome {
        Outcome::Success { .. } => return None,
        Outcome::Exhausted {
            total_max_attempts,
            ..
        } => format!(
            "Max retry attempts ({}) exceeded for OpenRouter request.",
            total_max_attempts
        ),
        Outcome::FatalAbort { error, .. } => error.message(),
    };
    Some(json!({
        "error": { "message": message },
        RETRY_INFO: {
            "attempts": outcome.attempts(),
            "success": false,
            "errors": outcome.failure_summaries(),
        },
    }))
}

/// `Retry Summary: N attempts, Success|Failed`, only when retries happened.
pub fn retry_summary(attempts: u32, success: bool, last_error: Option<&str>) -> Option<String> {
    if attempts <= 1 {
        return None;
    }
    let mut summary = format!(
        "Retry Summary: {} attempts, {}",
        attempts,
        if success { "Success" } else { "Failed" }
    );
    if let (false, Some(err)) = (success, last_error) {
        summary.push_str("\nLast Error: ");
        summary.push_str(err);
    }
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{AttemptError, AttemptOutcome, AttemptRecord};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn record(index: u32, outcome: AttemptOutcome) -> AttemptRecord {
        AttemptRecord {
            index,
            burst_index: 1,
            cycle_index: 1,
            timestamp: Utc::now(),
            outcome,
            elapsed: Duration::from_millis(10),
        }
    }

    fn throttled(index: u32) -> AttemptRecord {
        record(
            index,
            AttemptOutcome::RetryableError("HTTP 429 - Rate limit exceeded".into()),
        )
    }

    fn success(reply: UpstreamReply, attempts: u32) -> Outcome {
        let mut records: Vec<_> = (1..attempts).map(throttled).collect();
        records.push(record(attempts, AttemptOutcome::Success));
        Outcome::Success {
            reply,
            attempts_used: attempts,
            elapsed: Duration::from_secs(65),
            records,
        }
    }

    #[test]
    fn first_try_reply_is_untouched() {
        let body = json!({"choices": [{"message": {"content": "hi"}}]});
        let payload = compose(success(UpstreamReply::Complete(body.clone()), 1), false);
        assert_eq!(payload, ResponsePayload::Json(body));
    }

    #[test]
    fn retried_reply_is_annotated() {
        let body = json!({"id": "gen-1"});
        let payload = compose(success(UpstreamReply::Complete(body), 3), false);
        assert_eq!(
            payload,
            ResponsePayload::Json(json!({
                "id": "gen-1",
                "retry_info": {"attempts": 3, "elapsed": "1m5s"}
            }))
        );
    }

    #[test]
    fn retried_stream_annotates_last_chunk() {
        let chunks = vec![json!({"n": 1}), json!({"n": 2})];
        let payload = compose(success(UpstreamReply::Streamed(chunks), 2), true);
        let ResponsePayload::EventStream(chunks) = payload else {
            panic!("expected event stream");
        };
        assert_eq!(chunks[0], json!({"n": 1}));
        assert_eq!(chunks[1]["retry_info"]["attempts"], 2);
    }

    #[test]
    fn retried_empty_stream_gets_trailing_chunk() {
        let payload = compose(success(UpstreamReply::Streamed(vec![]), 2), true);
        let ResponsePayload::EventStream(chunks) = payload else {
            panic!("expected event stream");
        };
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0]["retry_info"]["elapsed"], "1m5s");
    }

    #[test]
    fn exhausted_lists_every_failure() {
        let outcome = Outcome::Exhausted {
            last_error: AttemptError::Http {
                status: 429,
                message: "Rate limit exceeded".into(),
            },
            total_max_attempts: 3,
            records: (1..=3).map(throttled).collect(),
        };
        let payload = compose(outcome, false);
        assert!(payload.is_error());
        assert_eq!(
            payload,
            ResponsePayload::Json(json!({
                "error": {"message": "Max retry attempts (3) exceeded for OpenRouter request."},
                "retry_info": {
                    "attempts": 3,
                    "success": false,
                    "errors": [
                        "attempt 1: HTTP 429 - Rate limit exceeded",
                        "attempt 2: HTTP 429 - Rate limit exceeded",
                        "attempt 3: HTTP 429 - Rate limit exceeded"
                    ]
                }
            }))
        );
    }

    #[test]
    fn fatal_failure_keeps_upstream_message_in_fixed_shape() {
        let outcome = Outcome::FatalAbort {
            error: AttemptError::Http {
                status: 404,
                message: "No endpoints found".into(),
            },
            records: vec![record(
                1,
                AttemptOutcome::FatalError("HTTP 404 - No endpoints found".into()),
            )],
        };
        assert_eq!(
            failure_body(&outcome).unwrap(),
            json!({
                "error": { "message": "No endpoints found" },
                "retry_info": {
                    "attempts": 1,
                    "success": false,
                    "errors": ["attempt 1: HTTP 404 - No endpoints found"]
                }
            })
        );
    }

    #[test]
    fn streaming_failure_is_one_event() {
        let outcome = Outcome::FatalAbort {
            error: AttemptError::Http {
                status: 401,
                message: "bad key".into(),
            },
            records: vec![record(1, AttemptOutcome::FatalError("HTTP 401 - bad key".into()))],
        };
        let payload = compose(outcome, true);
        let lines = payload.to_sse_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("data: {"));
        assert!(lines[0].contains("bad key"));
        assert_eq!(lines[1], "data: [DONE]\n\n");
    }

    #[test]
    fn summary_only_after_retries() {
        assert_eq!(retry_summary(1, true, None), None);
        assert_eq!(
            retry_summary(3, true, None).as_deref(),
            Some("Retry Summary: 3 attempts, Success")
        );
        assert_eq!(
            retry_summary(2, false, Some("HTTP 429 - slow down")).as_deref(),
            Some("Retry Summary: 2 attempts, Failed\nLast Error: HTTP 429 - slow down")
        );
    }
}
