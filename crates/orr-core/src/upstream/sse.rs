//! Incremental decoder for the upstream's server-sent event stream.

use serde_json::Value;
use thiserror::Error;

/// Keep-alive marker the upstream interleaves with real events.
const PROCESSING_MARKER: &str = ": OPENROUTER PROCESSING";

#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// A `data:` line carrying a JSON chunk.
    Data(Value),
    /// `data: [DONE]`.
    Done,
}

/// A `data:` line whose payload is neither JSON nor `[DONE]`.
#[derive(Debug, Error)]
#[error("undecodable stream chunk: {0}")]
pub struct SseDecodeError(#[from] serde_json::Error);

/// Splits arbitrary byte chunks into lines and decodes complete lines.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes; returns events for every line completed by them.
    /// A corrupt `data:` line fails the whole push: the stream can no longer
    /// be relayed faithfully.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>, SseDecodeError> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(ev) = decode_line(&String::from_utf8_lossy(&line))? {
                events.push(ev);
            }
        }
        Ok(events)
    }

    /// Decode whatever is left once the body ended without a final newline.
    pub fn finish(&mut self) -> Result<Vec<SseEvent>, SseDecodeError> {
        let rest = std::mem::take(&mut self.buffer);
        Ok(decode_line(&String::from_utf8_lossy(&rest))?
            .into_iter()
            .collect())
    }
}

fn decode_line(raw: &str) -> Result<Option<SseEvent>, SseDecodeError> {
    let cleaned = raw.replace(PROCESSING_MARKER, "");
    let line = cleaned.trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }
    Ok(Some(SseEvent::Data(serde_json::from_str(data)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_data_and_done() {
        let mut d = SseDecoder::new();
        let events = d.push(b"data: {\"a\":1}\n\ndata: [DONE]\n\n").unwrap();
        assert_eq!(events, vec![SseEvent::Data(json!({"a": 1})), SseEvent::Done]);
    }

    #[test]
    fn handles_lines_split_across_chunks() {
        let mut d = SseDecoder::new();
        assert!(d.push(b"data: {\"choi").unwrap().is_empty());
        let events = d.push(b"ces\":[]}\r\n").unwrap();
        assert_eq!(events, vec![SseEvent::Data(json!({"choices": []}))]);
    }

    #[test]
    fn strips_processing_comments() {
        let mut d = SseDecoder::new();
        let events = d
            .push(b": OPENROUTER PROCESSING\n\n: OPENROUTER PROCESSING\ndata: {\"x\":true}\n")
            .unwrap();
        assert_eq!(events, vec![SseEvent::Data(json!({"x": true}))]);
    }

    #[test]
    fn ignores_other_fields() {
        let mut d = SseDecoder::new();
        let events = d.push(b"event: ping\nid: 7\nretry: 100\n").unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn corrupt_data_line_is_an_error() {
        let mut d = SseDecoder::new();
        assert_eq!(d.push(b"data: {\"a\":1}\ndata: {\"trunc").unwrap().len(), 1);
        let err = d.push(b"ated\ndata: [DONE]\n").unwrap_err();
        assert!(err.to_string().starts_with("undecodable stream chunk"));
    }

    #[test]
    fn corrupt_trailing_line_is_an_error() {
        let mut d = SseDecoder::new();
        assert!(d.push(b"data: not-json").unwrap().is_empty());
        assert!(d.finish().is_err());
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut d = SseDecoder::new();
        assert!(d.push(b"data: [DONE]").unwrap().is_empty());
        assert_eq!(d.finish().unwrap(), vec![SseEvent::Done]);
        assert!(d.finish().unwrap().is_empty());
    }
}
