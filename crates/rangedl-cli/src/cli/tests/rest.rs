//! Tests for probe and config subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_probe() {
    match parse(&["rangedl", "probe", "https://example.com/big.iso"]) {
        CliCommand::Probe { url } => assert_eq!(url, "https://example.com/big.iso"),
        _ => panic!("expected Probe"),
    }
}

#[test]
fn cli_parse_config() {
    assert!(matches!(parse(&["rangedl", "config"]), CliCommand::Config));
}

#[test]
fn cli_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["rangedl", "frobnicate"]).is_err());
}
