//! CLI for the parfetch parallel downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use parfetch_core::config;
use std::path::PathBuf;

use commands::{run_checksum, run_get, run_probe, GetArgs};

/// Top-level CLI for parfetch.
#[derive(Debug, Parser)]
#[command(name = "parfetch")]
#[command(about = "parfetch: parallel HTTP range downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a URL, splitting it into byte ranges fetched in parallel.
    Get(GetArgs),

    /// Print size, ETag and range support of a URL without downloading it.
    Probe {
        /// Direct HTTP/HTTPS URL.
        url: String,
    },

    /// Compute the digest of a local file (SHA-256 unless --md5).
    Checksum {
        /// Path to the file.
        path: PathBuf,
        /// Print MD5 instead of SHA-256.
        #[arg(long)]
        md5: bool,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Get(args) => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_get(args, cfg).await?
            }
            CliCommand::Probe { url } => {
                let cfg = config::load_or_init()?;
                run_probe(&url, &cfg).await?
            }
            CliCommand::Checksum { path, md5 } => run_checksum(&path, md5).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
