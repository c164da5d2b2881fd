use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::retry::DelayRange;

/// Environment variable consulted when no global API key is configured.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Invalid configuration value, reported at load time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },
    #[error("{field} must be a finite, non-negative number of seconds (got {value})")]
    InvalidDelay { field: &'static str, value: f64 },
    #[error("{min_field} ({min}) must not exceed {max_field} ({max})")]
    InvertedRange {
        min_field: &'static str,
        max_field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("invalid upstream base_url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Burst/cycle retry schedule (`[retry]` section in config.toml).
///
/// Every request gets its own copy; nothing here is mutated after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts in one fast burst.
    pub attempts_per_burst: u32,
    /// Minimum spacing between attempts inside a burst (seconds).
    pub attempt_delay_min: f64,
    /// Maximum spacing between attempts inside a burst (seconds).
    pub attempt_delay_max: f64,
    /// Bursts per cycle.
    pub bursts_before_long_pause: u32,
    /// Minimum pause between bursts (seconds).
    pub burst_pause_min: f64,
    /// Maximum pause between bursts (seconds).
    pub burst_pause_max: f64,
    /// Number of cycles.
    pub cycles: u32,
    /// Fixed pause between cycles (seconds).
    pub long_pause: f64,
    /// Emit status and toast notifications to the host.
    pub notifications_enabled: bool,
    /// Emit an in-chat error event on final failure.
    pub in_chat_errors_enabled: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts_per_burst: 10,
            attempt_delay_min: 2.0,
            attempt_delay_max: 4.0,
            bursts_before_long_pause: 3,
            burst_pause_min: 15.0,
            burst_pause_max: 30.0,
            cycles: 2,
            long_pause: 60.0,
            notifications_enabled: true,
            in_chat_errors_enabled: true,
        }
    }
}

impl RetryConfig {
    /// Upper bound on attempts for one request.
    pub fn total_max_attempts(&self) -> u32 {
        self.attempts_per_burst
            .saturating_mul(self.bursts_before_long_pause)
            .saturating_mul(self.cycles)
    }

    /// Jitter range between attempts of one burst. Call on a validated config.
    pub fn attempt_delay(&self) -> DelayRange {
        DelayRange::clamped(self.attempt_delay_min, self.attempt_delay_max)
    }

    /// Jitter range between bursts of one cycle. Call on a validated config.
    pub fn burst_pause(&self) -> DelayRange {
        DelayRange::clamped(self.burst_pause_min, self.burst_pause_max)
    }

    pub fn long_pause_duration(&self) -> Duration {
        Duration::from_secs_f64(self.long_pause.max(0.0))
    }

    /// Check every range; a config that passes never fails at call time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, count) in [
            ("attempts_per_burst", self.attempts_per_burst),
            ("bursts_before_long_pause", self.bursts_before_long_pause),
            ("cycles", self.cycles),
        ] {
            if count == 0 {
                return Err(ConfigError::ZeroCount { field });
            }
        }
        DelayRange::named(
            "attempt_delay_min",
            self.attempt_delay_min,
            "attempt_delay_max",
            self.attempt_delay_max,
        )?;
        DelayRange::named(
            "burst_pause_min",
            self.burst_pause_min,
            "burst_pause_max",
            self.burst_pause_max,
        )?;
        if !self.long_pause.is_finite() || self.long_pause < 0.0 {
            return Err(ConfigError::InvalidDelay {
                field: "long_pause",
                value: self.long_pause,
            });
        }
        Ok(())
    }
}

/// Upstream API endpoint and credentials (`[upstream]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Global API key; a per-caller key overrides it.
    pub api_key: String,
    /// Sent as `HTTP-Referer`.
    pub referer: String,
    /// Sent as `X-Title`.
    pub title: String,
    /// Total timeout for non-streaming requests (seconds).
    pub request_timeout_secs: u64,
    /// Connect timeout for every request (seconds).
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: String::new(),
            referer: "https://openwebui.com".to_string(),
            title: "Open WebUI".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 15,
        }
    }
}

impl UpstreamConfig {
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

/// Host event delivery settings (`[notifications]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Event name for the in-chat error message.
    pub in_chat_event_name: String,
    /// Upper bound on one sink dispatch (milliseconds).
    pub dispatch_timeout_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            in_chat_event_name: "chat:message:error".to_string(),
            dispatch_timeout_ms: 2_000,
        }
    }
}

impl NotificationConfig {
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }
}

/// Global configuration loaded from `~/.config/orr/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrrConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl OrrConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.upstream.validate()?;
        self.retry.validate()
    }

    /// Fill an empty global key from `OPENROUTER_API_KEY`.
    pub fn apply_env(&mut self) {
        if self.upstream.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                self.upstream.api_key = key;
            }
        }
    }
}

/// Pretty TOML, as written to a fresh config file.
pub fn to_toml_string(cfg: &OrrConfig) -> Result<String> {
    Ok(toml::to_string_pretty(cfg)?)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("orr")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<OrrConfig> {
    load_or_init_at(&config_path()?)
}

/// Like `load_or_init` but at an explicit path. The result is validated.
pub fn load_or_init_at(path: &Path) -> Result<OrrConfig> {
    if !path.exists() {
        let default_cfg = OrrConfig::default();
        let toml = to_toml_string(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: OrrConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
