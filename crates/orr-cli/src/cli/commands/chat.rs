//! `orr chat <prompt>` – one prompt through the retrying proxy.

use anyhow::{bail, Result};
use orr_core::config::OrrConfig;
use orr_core::{Caller, ChatRequest, ResponsePayload, RetryProxy};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cli::console::ConsoleSink;
use crate::cli::output;

#[derive(Debug, Clone)]
pub struct ChatArgs {
    pub prompt: String,
    pub model: String,
    pub system: Option<String>,
    pub stream: bool,
    pub api_key: Option<String>,
    pub user: Option<String>,
    pub raw: bool,
}

pub async fn run_chat(cfg: OrrConfig, args: ChatArgs) -> Result<()> {
    let request = ChatRequest::user_message(
        args.model,
        args.prompt,
        args.system.as_deref(),
        args.stream,
    );
    let caller = Caller {
        name: args.user,
        id: None,
        api_key: args.api_key,
    };
    let payload = send(cfg, request, &caller).await?;

    if args.raw {
        print!("{}", output::raw(&payload));
        println!();
    }
    if let Some(message) = output::error_message(&payload) {
        bail!(message);
    }
    if !args.raw {
        println!("{}", output::assistant_text(&payload));
    }
    Ok(())
}

/// Run one request with console progress; Ctrl-C cancels it.
pub(super) async fn send(
    cfg: OrrConfig,
    request: ChatRequest,
    caller: &Caller,
) -> Result<ResponsePayload> {
    let proxy = RetryProxy::new(cfg)?;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancelling...");
            trigger.cancel();
        }
    });

    let result = proxy
        .handle(request, caller, Some(Arc::new(ConsoleSink)), cancel)
        .await;
    watcher.abort();
    Ok(result?)
}
