//! `orr request <file>` – send a full chat-completion body as-is.

use anyhow::{bail, Context, Result};
use orr_core::config::OrrConfig;
use orr_core::{Caller, ChatRequest};
use std::io::Read;
use std::path::Path;

use super::chat::send;
use crate::cli::output;

pub async fn run_request(cfg: OrrConfig, path: &Path, api_key: Option<String>) -> Result<()> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading request body from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading request body {}", path.display()))?
    };
    let body = serde_json::from_str(&text)
        .with_context(|| format!("parsing request body {}", path.display()))?;
    let request = ChatRequest::from_value(body)?;

    let caller = Caller {
        api_key,
        ..Caller::default()
    };
    let payload = send(cfg, request, &caller).await?;
    print!("{}", output::raw(&payload));
    println!();
    if let Some(message) = output::error_message(&payload) {
        bail!(message);
    }
    Ok(())
}
