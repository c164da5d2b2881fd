//! Failure of a single upstream attempt, kept as plain data so it can be
//! classified, recorded and cloned into the final outcome.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// Upstream replied with a non-2xx status.
    #[error("HTTP {status} - {message}")]
    Http { status: u16, message: String },
    /// Upstream replied 2xx (or mid-stream) with an `{"error": {...}}` envelope.
    #[error("upstream error - {message}")]
    Envelope { code: Option<u16>, message: String },
    /// Connect or read timed out.
    #[error("timeout: {0}")]
    Timeout(String),
    /// Connection refused/reset, DNS failure, or the body stream broke.
    #[error("connection error: {0}")]
    Connection(String),
    /// Reply could not be decoded.
    #[error("malformed upstream reply: {0}")]
    Decode(String),
    /// Anything else (client construction, unexpected transport errors).
    #[error("{0}")]
    Other(String),
}

impl AttemptError {
    /// Build from a non-2xx status and its raw body. The message comes from the
    /// body's `error.message` when present.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("HTTP {} error", status));
        AttemptError::Http { status, message }
    }

    /// HTTP status or envelope code, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            AttemptError::Http { status, .. } => Some(*status),
            AttemptError::Envelope { code, .. } => *code,
            _ => None,
        }
    }

    /// Message for the caller-facing `error.message` field.
    pub fn message(&self) -> String {
        match self {
            AttemptError::Http { message, .. } | AttemptError::Envelope { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AttemptError::Timeout(e.to_string())
        } else if e.is_connect() || e.is_request() || e.is_body() {
            AttemptError::Connection(e.to_string())
        } else if e.is_decode() {
            AttemptError::Decode(e.to_string())
        } else {
            AttemptError::Other(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_uses_body_message() {
        let err = AttemptError::from_status(
            429,
            r#"{"error":{"message":"Rate limit exceeded","code":429}}"#,
        );
        assert_eq!(
            err,
            AttemptError::Http {
                status: 429,
                message: "Rate limit exceeded".to_string()
            }
        );
        assert_eq!(err.to_string(), "HTTP 429 - Rate limit exceeded");
    }

    #[test]
    fn from_status_falls_back_for_plain_bodies() {
        let err = AttemptError::from_status(502, "<html>bad gateway</html>");
        assert_eq!(err.message(), "HTTP 502 error");
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn envelope_display_without_code() {
        let err = AttemptError::Envelope {
            code: None,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "upstream error - boom");
        assert_eq!(err.status(), None);
    }
}
