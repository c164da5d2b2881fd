//! CLI command handlers, one file per command.

mod chat;
mod config;
mod request;

pub use chat::{run_chat, ChatArgs};
pub use config::run_config;
pub use request::run_request;
