//! Tests for the chat and request subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_chat_defaults() {
    match parse(&["orr", "chat", "hello there"]) {
        CliCommand::Chat {
            prompt,
            model,
            system,
            stream,
            user,
            raw,
            ..
        } => {
            assert_eq!(prompt, "hello there");
            assert_eq!(model, "openai/gpt-4o");
            assert!(system.is_none());
            assert!(!stream);
            assert!(user.is_none());
            assert!(!raw);
        }
        _ => panic!("expected Chat"),
    }
}

#[test]
fn cli_parse_chat_all_flags() {
    match parse(&[
        "orr",
        "chat",
        "hi",
        "-m",
        "anthropic/claude-3.5-sonnet",
        "--system",
        "be brief",
        "--stream",
        "--api-key",
        "sk-test",
        "--user",
        "alice",
        "--raw",
    ]) {
        CliCommand::Chat {
            model,
            system,
            stream,
            api_key,
            user,
            raw,
            ..
        } => {
            assert_eq!(model, "anthropic/claude-3.5-sonnet");
            assert_eq!(system.as_deref(), Some("be brief"));
            assert!(stream);
            assert_eq!(api_key.as_deref(), Some("sk-test"));
            assert_eq!(user.as_deref(), Some("alice"));
            assert!(raw);
        }
        _ => panic!("expected Chat with flags"),
    }
}

#[test]
fn cli_parse_chat_requires_prompt() {
    assert!(Cli::try_parse_from(["orr", "chat"]).is_err());
}

#[test]
fn cli_parse_request() {
    match parse(&["orr", "request", "body.json"]) {
        CliCommand::Request { path, .. } => {
            assert_eq!(path, std::path::PathBuf::from("body.json"));
        }
        _ => panic!("expected Request"),
    }
}

#[test]
fn cli_parse_request_stdin() {
    match parse(&["orr", "request", "-"]) {
        CliCommand::Request { path, .. } => assert_eq!(path.to_str(), Some("-")),
        _ => panic!("expected Request from stdin"),
    }
}
