//! Per-request retry state: the attempt log and the terminal outcome.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::error::AttemptError;
use crate::config::RetryConfig;
use crate::upstream::UpstreamReply;

/// The session was torn down by the host (caller disconnected, request dropped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request cancelled by host")
    }
}

impl std::error::Error for Cancelled {}

/// Who is asking for which model; used to tag log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    pub model: String,
}

impl Identity {
    pub fn new(user: impl Into<String>, model: impl Into<String>) -> Self {
        let user = user.into();
        let model = model.into();
        Self {
            user: if user.is_empty() { "unknown".to_string() } else { user },
            model: if model.is_empty() { "unknown".to_string() } else { model },
        }
    }

    /// Display name of the model's vendor, from the `vendor/model` prefix.
    pub fn provider_name(&self) -> String {
        let Some((prefix, _)) = self.model.split_once('/') else {
            return "Unknown".to_string();
        };
        let prefix = prefix.to_lowercase();
        let known = match prefix.as_str() {
            "anthropic" => "Anthropic",
            "openai" => "OpenAI",
            "google" => "Google",
            "meta" => "Meta",
            "mistral" => "Mistral",
            "cohere" => "Cohere",
            "together" => "Together AI",
            "huggingface" => "Hugging Face",
            "replicate" => "Replicate",
            "perplexity" => "Perplexity",
            _ => return title_case(&prefix),
        };
        known.to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user, self.model)
    }
}

fn title_case(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result of one attempt as it is kept in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    RetryableError(String),
    FatalError(String),
}

impl AttemptOutcome {
    pub fn detail(&self) -> Option<&str> {
        match self {
            AttemptOutcome::Success => None,
            AttemptOutcome::RetryableError(d) | AttemptOutcome::FatalError(d) => Some(d),
        }
    }
}

/// One attempt in the session log. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    /// Global 1-based attempt number.
    pub index: u32,
    pub burst_index: u32,
    pub cycle_index: u32,
    pub timestamp: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    /// Time the attempt itself took.
    pub elapsed: Duration,
}

impl AttemptRecord {
    /// `attempt <n>: <detail>` for failed attempts.
    pub fn failure_summary(&self) -> Option<String> {
        self.outcome
            .detail()
            .map(|d| format!("attempt {}: {}", self.index, d))
    }
}

/// Live state of one inbound request. Created at request start and consumed
/// by the scheduler when the request resolves.
#[derive(Debug)]
pub struct RetrySession {
    pub(crate) config: RetryConfig,
    pub(crate) total_max_attempts: u32,
    pub(crate) records: Vec<AttemptRecord>,
    pub(crate) identity: Identity,
    pub(crate) cancel: CancellationToken,
    pub(crate) started: Instant,
}

impl RetrySession {
    pub fn new(config: RetryConfig, identity: Identity, cancel: CancellationToken) -> Self {
        let total_max_attempts = config.total_max_attempts();
        Self {
            config,
            total_max_attempts,
            records: Vec::new(),
            identity,
            cancel,
            started: Instant::now(),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn total_max_attempts(&self) -> u32 {
        self.total_max_attempts
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn records(&self) -> &[AttemptRecord] {
        &self.records
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn push(&mut self, record: AttemptRecord) {
        self.records.push(record);
    }
}

/// Terminal result of a session.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success {
        reply: UpstreamReply,
        attempts_used: u32,
        elapsed: Duration,
        records: Vec<AttemptRecord>,
    },
    /// Every scheduled attempt was retryable and none succeeded.
    Exhausted {
        last_error: AttemptError,
        total_max_attempts: u32,
        records: Vec<AttemptRecord>,
    },
    /// An attempt failed with a non-retryable error.
    FatalAbort {
        error: AttemptError,
        records: Vec<AttemptRecord>,
    },
}

impl Outcome {
    pub fn records(&self) -> &[AttemptRecord] {
        match self {
            Outcome::Success { records, .. }
            | Outcome::Exhausted { records, .. }
            | Outcome::FatalAbort { records, .. } => records,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.records().len() as u32
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Summaries of every failed attempt, in order.
    pub fn failure_summaries(&self) -> Vec<String> {
        self.records()
            .iter()
            .filter_map(AttemptRecord::failure_summary)
            .collect()
    }
}

/// `<m>m<s>s`, as shown in status lines.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}m{}s", secs / 60, secs % 60)
}
