#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod telemetry;

use std::process;

use anyhow::Context;
use marketdata_storage::StorageClient;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "marketdata_cli::startup";
pub const TRACING_TARGET_CONFIG: &str = "marketdata_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "marketdata_cli::command";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_COMMAND,
            error = %format!("{error:#}"),
            "command failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    telemetry::init_tracing()?;
    cli.log();
    cli.validate()?;

    let client = StorageClient::connect(&cli.storage).context("failed to connect to storage")?;
    commands::run(&client, cli.command).await
}
