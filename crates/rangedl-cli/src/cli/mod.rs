//! CLI for the rangedl download manager.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rangedl_core::config;
use std::path::PathBuf;

use commands::{run_config, run_get, run_probe, GetArgs};

/// Top-level CLI for the rangedl download manager.
#[derive(Debug, Parser)]
#[command(name = "rangedl")]
#[command(about = "rangedl: segmented, concurrent HTTP downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a URL using parallel range requests.
    Get {
        /// Direct HTTP/HTTPS URL to download.
        url: String,

        /// Destination file (default: last URL path segment in the current directory).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Parallel connections (default from config).
        #[arg(short = 'c', long, value_name = "N")]
        connections: Option<usize>,

        /// Retries shared by all parts (default from config).
        #[arg(short = 'r', long, value_name = "N")]
        retries: Option<u32>,
    },

    /// Query size and range support without downloading.
    Probe {
        /// Direct HTTP/HTTPS URL to probe.
        url: String,
    },

    /// Print the effective configuration and where it is stored.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                url,
                output,
                connections,
                retries,
            } => {
                run_get(
                    &cfg,
                    GetArgs {
                        url,
                        output,
                        connections,
                        retries,
                    },
                )
                .await?
            }
            CliCommand::Probe { url } => run_probe(&cfg, &url).await?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
