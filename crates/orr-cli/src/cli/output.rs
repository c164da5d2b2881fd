//! Rendering of the proxy's payload on stdout.

use orr_core::ResponsePayload;
use serde_json::Value;

/// Assistant text of a reply: `message.content` of the first choice, or the
/// concatenated `delta.content` of every streamed chunk.
pub fn assistant_text(payload: &ResponsePayload) -> String {
    match payload {
        ResponsePayload::Json(body) => body["choices"][0]["message"]["content"]
            .as_str()
            .or_else(|| body["text"].as_str())
            .unwrap_or_default()
            .to_string(),
        ResponsePayload::EventStream(chunks) => chunks
            .iter()
            .filter_map(|c| c["choices"][0]["delta"]["content"].as_str())
            .collect(),
    }
}

/// `error.message` of a failure payload.
pub fn error_message(payload: &ResponsePayload) -> Option<String> {
    let body: &Value = match payload {
        ResponsePayload::Json(body) => body,
        ResponsePayload::EventStream(chunks) => chunks.iter().find(|c| c.get("error").is_some())?,
    };
    body["error"]["message"].as_str().map(str::to_string)
}

/// Raw form: pretty JSON, or the event stream exactly as a client would see it.
pub fn raw(payload: &ResponsePayload) -> String {
    match payload {
        ResponsePayload::Json(body) => {
            serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string())
        }
        ResponsePayload::EventStream(_) => payload.to_sse_lines().concat(),
    }
}
