//! `parfetch get` – probe, split, fetch ranges in parallel and assemble the file.

use anyhow::{anyhow, Result};
use clap::Args;
use parfetch_core::checksum::{DigestAlgorithm, ExpectedDigest};
use parfetch_core::config::FetchConfig;
use parfetch_core::control::CancelToken;
use parfetch_core::downloader::Progress;
use parfetch_core::transfer::{self, Mode, TransferRequest};
use parfetch_core::url_model;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Direct HTTP/HTTPS URL to download.
    pub url: String,

    /// Destination file (default: last URL path segment, or download.bin).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Download with a single GET instead of parallel ranges.
    #[arg(short = 's', long, conflicts_with = "parallel")]
    pub sequential: bool,

    /// Split the download into WORKERS ranges (default from config).
    #[arg(
        short = 'p',
        long = "parallel",
        value_name = "WORKERS",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub parallel: Option<u32>,

    /// At most N ranges in flight at once.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_concurrent: Option<u32>,

    /// Give up on a single range after SECS seconds.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub range_timeout: Option<u64>,

    /// Refuse to download unless the server's ETag equals VALUE.
    #[arg(long, value_name = "VALUE")]
    pub etag: Option<String>,

    /// Expected SHA-256 of the finished file.
    #[arg(long, value_name = "HEX", conflicts_with = "md5")]
    pub sha256: Option<String>,

    /// Expected MD5 of the finished file.
    #[arg(long, value_name = "HEX")]
    pub md5: Option<String>,
}

impl GetArgs {
    pub fn mode(&self, cfg: &FetchConfig) -> Mode {
        if self.sequential {
            Mode::Sequential
        } else {
            Mode::Parallel {
                workers: self.parallel.unwrap_or(cfg.workers),
            }
        }
    }

    /// Apply flag overrides on top of the loaded config.
    pub fn apply_overrides(&self, cfg: &mut FetchConfig) {
        if let Some(n) = self.max_concurrent {
            cfg.max_concurrent = Some(n as usize);
        }
        if let Some(secs) = self.range_timeout {
            cfg.range_timeout_secs = secs;
        }
    }

    pub fn expected_digest(&self) -> Result<Option<ExpectedDigest>> {
        let (algorithm, hex) = match (&self.sha256, &self.md5) {
            (Some(hex), _) => (DigestAlgorithm::Sha256, hex),
            (None, Some(hex)) => (DigestAlgorithm::Md5, hex),
            (None, None) => return Ok(None),
        };
        let parsed = format!("{}:{}", algorithm, hex)
            .parse::<ExpectedDigest>()
            .map_err(|e| anyhow!(e))?;
        Ok(Some(parsed))
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(url_model::output_filename(&self.url)))
    }
}

pub async fn run_get(args: GetArgs, mut cfg: FetchConfig) -> Result<()> {
    args.apply_overrides(&mut cfg);
    let mut req = TransferRequest::new(args.url.clone(), args.output_path(), args.mode(&cfg));
    req.expected_etag = args.etag.clone();
    req.expected_digest = args.expected_digest()?;
    tracing::info!(url = %req.url, output = %req.output.display(), mode = ?req.mode, "starting transfer");

    let cancel = CancelToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupted, cancelling transfer...");
            signal_token.cancel();
        }
    });

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<Progress>(16);
    const PROGRESS_INTERVAL_MS: u128 = 500;
    let progress_handle = tokio::spawn(async move {
        let started = Instant::now();
        let mut last_print = Instant::now();
        let mut printed = false;
        while let Some(p) = progress_rx.recv().await {
            let now = Instant::now();
            if now.duration_since(last_print).as_millis() >= PROGRESS_INTERVAL_MS
                || p.ranges_done == p.ranges_total
            {
                let secs = started.elapsed().as_secs_f64();
                let rate_mib = if secs > 0.0 {
                    p.bytes_done as f64 / secs / 1_048_576.0
                } else {
                    0.0
                };
                println!(
                    "  {:.1} / {:.1} MiB ({:.1}%)  ranges {}/{}  {:.2} MiB/s",
                    p.bytes_done as f64 / 1_048_576.0,
                    p.total_bytes as f64 / 1_048_576.0,
                    p.fraction() * 100.0,
                    p.ranges_done,
                    p.ranges_total,
                    rate_mib
                );
                last_print = now;
                printed = true;
            }
        }
        if printed {
            println!();
        }
    });

    let report = tokio::task::spawn_blocking(move || {
        let res = transfer::run_transfer(&req, &cfg, &cancel, Some(&progress_tx));
        drop(progress_tx);
        res.map(|r| (r, req.output))
    })
    .await?;
    let _ = progress_handle.await;

    let (report, output) = report?;
    println!(
        "Downloaded {} bytes in {} range(s) to {} ({:.2}s)",
        report.bytes_written,
        report.ranges,
        output.display(),
        report.elapsed.as_secs_f64()
    );
    Ok(())
}
