//! Host-facing entry point: one inbound chat request in, one payload out.
//!
//! Resolves the credential, normalizes the model id, runs the retry session
//! and composes the reply. Failures come back as an error payload; only
//! cancellation is reported as `Err`.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::compose::{self, compose, ResponsePayload};
use crate::config::{ConfigError, OrrConfig};
use crate::control::SessionControl;
use crate::notify::{EventSink, Notifier};
use crate::retry::{run_session, Cancelled, Identity, RetrySession};
use crate::upstream::{AttemptExecutor, Credential, HttpExecutor, UpstreamRequest};

/// Message returned when neither the caller nor the config supplies a key.
pub const MISSING_KEY_MESSAGE: &str = "OPENROUTER_API_KEY not provided.";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("chat request body must be a JSON object")]
    NotAnObject,
    #[error("chat request has no model")]
    MissingModel,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Inbound chat-completion body. Every field is forwarded as-is except
/// `model`, which is normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    body: Map<String, Value>,
}

impl ChatRequest {
    pub fn from_value(value: Value) -> Result<Self, ProxyError> {
        let Value::Object(body) = value else {
            return Err(ProxyError::NotAnObject);
        };
        if !body.get("model").is_some_and(Value::is_string) {
            return Err(ProxyError::MissingModel);
        }
        Ok(Self { body })
    }

    /// Single-turn request, optionally with a system prompt.
    pub fn user_message(
        model: impl Into<String>,
        prompt: impl Into<String>,
        system: Option<&str>,
        stream: bool,
    ) -> Self {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt.into()}));
        let mut body = Map::new();
        body.insert("model".to_string(), Value::String(model.into()));
        body.insert("messages".to_string(), Value::Array(messages));
        body.insert("stream".to_string(), Value::Bool(stream));
        Self { body }
    }

    pub fn model(&self) -> &str {
        self.body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn is_streaming(&self) -> bool {
        self.body
            .get("stream")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn into_upstream_body(mut self, model: &str) -> Value {
        self.body
            .insert("model".to_string(), Value::String(model.to_string()));
        Value::Object(self.body)
    }
}

/// The user on whose behalf the request runs.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub name: Option<String>,
    pub id: Option<String>,
    /// Per-user key; overrides the global one when non-blank.
    pub api_key: Option<String>,
}

impl Caller {
    fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("unknown")
    }
}

/// Per-user override first, then the global key. Blank keys do not count.
pub fn resolve_credential(user_key: Option<&str>, global_key: &str) -> Option<Credential> {
    user_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .or_else(|| Some(global_key.trim()).filter(|k| !k.is_empty()))
        .map(Credential::new)
}

/// Strip the host's `<pipe>.` prefix: `orr.openai/gpt-4o` -> `openai/gpt-4o`.
/// Only a slash-free prefix followed by a `<vendor>/<model>` id is stripped,
/// so dots inside model names (`claude-3.5`, `gpt-3.5-turbo`) survive.
pub fn normalize_model_id(raw: &str) -> &str {
    match raw.split_once('.') {
        Some((prefix, rest)) if !prefix.contains('/') && rest.contains('/') => rest,
        _ => raw,
    }
}

/// Retrying proxy over an attempt executor (the real HTTP one by default).
pub struct RetryProxy<E = HttpExecutor> {
    config: OrrConfig,
    executor: E,
    control: Arc<SessionControl>,
}

impl RetryProxy<HttpExecutor> {
    pub fn new(config: OrrConfig) -> Result<Self, ProxyError> {
        Self::with_executor(config, HttpExecutor::new())
    }
}

impl<E: AttemptExecutor> RetryProxy<E> {
    /// Build a proxy; the config is validated here, once.
    pub fn with_executor(config: OrrConfig, executor: E) -> Result<Self, ProxyError> {
        config.validate()?;
        Ok(Self {
            config,
            executor,
            control: Arc::new(SessionControl::new()),
        })
    }

    pub fn config(&self) -> &OrrConfig {
        &self.config
    }

    /// Registry of sessions started with `handle_tracked`.
    pub fn control(&self) -> &Arc<SessionControl> {
        &self.control
    }

    /// Run one request to completion.
    pub async fn handle(
        &self,
        request: ChatRequest,
        caller: &Caller,
        sink: Option<Arc<dyn EventSink>>,
        cancel: CancellationToken,
    ) -> Result<ResponsePayload, Cancelled> {
        let streaming = request.is_streaming();
        let Some(credential) =
            resolve_credential(caller.api_key.as_deref(), &self.config.upstream.api_key)
        else {
            tracing::warn!("{} - no API key configured; not calling upstream", caller.label());
            let body = json!({ "error": { "message": MISSING_KEY_MESSAGE } });
            return Ok(if streaming {
                ResponsePayload::EventStream(vec![body])
            } else {
                ResponsePayload::Json(body)
            });
        };

        let model = normalize_model_id(request.model()).to_string();
        let upstream = UpstreamRequest::new(
            &self.config.upstream,
            credential,
            request.into_upstream_body(&model),
            streaming,
        );
        let notifier = Notifier::new(sink, &self.config.retry, &self.config.notifications);
        let identity = Identity::new(caller.label(), model);
        tracing::debug!(
            "{} - starting session (stream={}, max attempts {})",
            identity,
            streaming,
            self.config.retry.total_max_attempts()
        );
        let session = RetrySession::new(self.config.retry.clone(), identity, cancel);

        let outcome = run_session(session, &self.executor, &upstream, &notifier).await?;
        if let Some(failure) = compose::failure_body(&outcome) {
            notifier.in_chat_error(&failure["error"]).await;
        }
        Ok(compose(outcome, streaming))
    }

    /// Like `handle`, but registered under `request_id` so it can be cancelled
    /// through `control()` while it runs.
    pub async fn handle_tracked(
        &self,
        request_id: &str,
        request: ChatRequest,
        caller: &Caller,
        sink: Option<Arc<dyn EventSink>>,
    ) -> Result<ResponsePayload, Cancelled> {
        let guard = self.control.register(request_id);
        self.handle(request, caller, sink, guard.token()).await
    }
}
