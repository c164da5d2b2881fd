//! Classify HTTP status and transport errors into retry error kinds.
//!
//! Policy: 429 and network failures are retried; 5xx is treated as transient
//! upstream instability and retried too; every other 4xx and anything
//! unexpected is fatal.

use super::error::AttemptError;

/// Fine-grained classification of a failed attempt, used for logging and
/// to derive the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (429).
    Throttled,
    /// Network-level failure (connection reset, DNS, broken stream).
    Connection,
    /// Server-side failure (5xx).
    Http5xx(u16),
    /// Request rejected by the server (4xx other than 429).
    Client(u16),
    /// Any other error.
    Other,
}

/// Retry decision for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Retryable,
    Fatal,
}

impl ErrorKind {
    pub fn classification(self) -> Classification {
        match self {
            ErrorKind::Timeout
            | ErrorKind::Throttled
            | ErrorKind::Connection
            | ErrorKind::Http5xx(_) => Classification::Retryable,
            ErrorKind::Client(_) | ErrorKind::Other => Classification::Fatal,
        }
    }
}

/// Classify an HTTP status code (or an error envelope's numeric code).
pub fn classify_http_status(code: u16) -> ErrorKind {
    match code {
        429 => ErrorKind::Throttled,
        400..=499 => ErrorKind::Client(code),
        500..=599 => ErrorKind::Http5xx(code),
        _ => ErrorKind::Other,
    }
}

/// Map an attempt failure to its `ErrorKind`.
pub fn error_kind(e: &AttemptError) -> ErrorKind {
    match e {
        AttemptError::Http { status, .. } => classify_http_status(*status),
        AttemptError::Envelope { code: Some(code), .. } => classify_http_status(*code),
        AttemptError::Envelope { code: None, .. } => ErrorKind::Other,
        AttemptError::Timeout(_) => ErrorKind::Timeout,
        AttemptError::Connection(_) => ErrorKind::Connection,
        AttemptError::Decode(_) | AttemptError::Other(_) => ErrorKind::Other,
    }
}

/// Decide whether a failed attempt may be retried.
pub fn classify(e: &AttemptError) -> Classification {
    error_kind(e).classification()
}
