//! Tests for the config subcommand and global options.

use super::{parse, parse_full};
use crate::cli::{Cli, CliCommand, ConfigAction};
use clap::Parser;

#[test]
fn cli_parse_config_defaults_to_show() {
    match parse(&["orr", "config"]) {
        CliCommand::Config { action } => assert_eq!(action, ConfigAction::Show),
        _ => panic!("expected Config"),
    }
}

#[test]
fn cli_parse_config_actions() {
    for (arg, expected) in [
        ("path", ConfigAction::Path),
        ("show", ConfigAction::Show),
        ("check", ConfigAction::Check),
    ] {
        match parse(&["orr", "config", arg]) {
            CliCommand::Config { action } => assert_eq!(action, expected),
            _ => panic!("expected Config {}", arg),
        }
    }
}

#[test]
fn cli_parse_config_rejects_unknown_action() {
    assert!(Cli::try_parse_from(["orr", "config", "edit"]).is_err());
}

#[test]
fn cli_parse_global_config_path() {
    let cli = parse_full(&["orr", "chat", "hi", "--config", "/tmp/orr.toml"]);
    assert_eq!(
        cli.config.as_deref(),
        Some(std::path::Path::new("/tmp/orr.toml"))
    );
    let cli = parse_full(&["orr", "--config", "/tmp/orr.toml", "config", "check"]);
    assert!(cli.config.is_some());
}
