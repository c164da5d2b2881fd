//! `orr config path|show|check`.

use anyhow::Result;
use orr_core::config;
use std::path::Path;

use crate::cli::ConfigAction;

pub fn run_config(path: &Path, action: ConfigAction) -> Result<()> {
    if action == ConfigAction::Path {
        println!("{}", path.display());
        return Ok(());
    }

    let mut cfg = config::load_or_init_at(path)?;
    cfg.apply_env();
    match action {
        ConfigAction::Show => {
            if !cfg.upstream.api_key.is_empty() {
                cfg.upstream.api_key = "***".to_string();
            }
            print!("{}", config::to_toml_string(&cfg)?);
        }
        ConfigAction::Check => {
            let retry = &cfg.retry;
            println!("config OK: {}", path.display());
            println!(
                "schedule: {} attempts x {} bursts x {} cycles = {} attempts",
                retry.attempts_per_burst,
                retry.bursts_before_long_pause,
                retry.cycles,
                retry.total_max_attempts()
            );
            println!(
                "pauses: {}-{}s between attempts, {}-{}s between bursts, {}s between cycles",
                retry.attempt_delay_min,
                retry.attempt_delay_max,
                retry.burst_pause_min,
                retry.burst_pause_max,
                retry.long_pause
            );
            if cfg.upstream.api_key.trim().is_empty() {
                println!("warning: no API key configured; set {}", config::API_KEY_ENV);
            }
        }
        ConfigAction::Path => {}
    }
    Ok(())
}
