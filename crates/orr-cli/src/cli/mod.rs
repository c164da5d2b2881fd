//! CLI for the ORR retrying chat-completion proxy.

mod commands;
mod console;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use orr_core::config;
use std::path::PathBuf;

use commands::{run_chat, run_config, run_request, ChatArgs};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "orr")]
#[command(about = "ORR: chat completions that ride out upstream rate limits", long_about = None)]
pub struct Cli {
    /// Use this config file instead of ~/.config/orr/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send one prompt and print the reply.
    Chat {
        /// User prompt.
        prompt: String,

        /// Model id, e.g. openai/gpt-4o.
        #[arg(long, short, default_value = "openai/gpt-4o")]
        model: String,

        /// Optional system prompt.
        #[arg(long)]
        system: Option<String>,

        /// Ask the upstream for an event stream.
        #[arg(long)]
        stream: bool,

        /// API key for this request (overrides the configured key).
        #[arg(long, env = "ORR_USER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Name to tag log lines with.
        #[arg(long)]
        user: Option<String>,

        /// Print the raw JSON / event stream instead of the assistant text.
        #[arg(long)]
        raw: bool,
    },

    /// Send a complete chat-completion JSON body from a file ("-" for stdin).
    Request {
        /// Path to the JSON body.
        path: PathBuf,

        /// API key for this request (overrides the configured key).
        #[arg(long, env = "ORR_USER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Inspect the configuration.
    Config {
        #[arg(value_enum, default_value = "show")]
        action: ConfigAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigAction {
    /// Print the config file location.
    Path,
    /// Print the effective configuration (API key masked).
    Show,
    /// Validate the configuration and print the retry schedule.
    Check,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let path = match cli.config {
            Some(path) => path,
            None => config::config_path()?,
        };

        if let CliCommand::Config { action } = cli.command {
            return run_config(&path, action);
        }

        let mut cfg = config::load_or_init_at(&path)?;
        cfg.apply_env();
        tracing::debug!("loaded config from {}", path.display());

        match cli.command {
            CliCommand::Chat {
                prompt,
                model,
                system,
                stream,
                api_key,
                user,
                raw,
            } => {
                run_chat(
                    cfg,
                    ChatArgs {
                        prompt,
                        model,
                        system,
                        stream,
                        api_key,
                        user,
                        raw,
                    },
                )
                .await?
            }
            CliCommand::Request { path, api_key } => run_request(cfg, &path, api_key).await?,
            CliCommand::Config { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
