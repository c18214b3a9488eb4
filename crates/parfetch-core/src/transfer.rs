//! End-to-end transfer: probe, plan, preallocate, fetch, finalize, verify.
//!
//! Data is written to `<output>.part` and renamed over `<output>` only when
//! every byte has arrived, so `<output>` is either the previous file, the
//! complete new file, or absent. Never a partial one.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::checksum::{self, ExpectedDigest};
use crate::config::FetchConfig;
use crate::control::CancelToken;
use crate::downloader::{self, CurlOptions, CurlRangeFetcher, Progress, RunOptions, TransferReport};
use crate::probe::{self, ProbeOptions, ResourceInfo};
use crate::segmenter;
use crate::storage::{self, StorageWriter};

/// How the body is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One GET for the whole body.
    Sequential,
    /// Split into `workers` ranges fetched concurrently.
    Parallel { workers: u32 },
}

/// Everything needed to run one transfer.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub url: String,
    pub output: PathBuf,
    pub mode: Mode,
    /// Extra request headers (e.g. auth), sent on every request.
    pub headers: HashMap<String, String>,
    /// Abort before downloading if the server's ETag differs.
    pub expected_etag: Option<String>,
    /// Verify the finished file; on mismatch it is removed.
    pub expected_digest: Option<ExpectedDigest>,
}

impl TransferRequest {
    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            url: url.into(),
            output: output.into(),
            mode,
            headers: HashMap::new(),
            expected_etag: None,
            expected_digest: None,
        }
    }
}

/// Runs a full transfer. Blocking: call from `spawn_blocking` in async code.
pub fn run_transfer(
    req: &TransferRequest,
    cfg: &FetchConfig,
    cancel: &CancelToken,
    progress: Option<&tokio::sync::mpsc::Sender<Progress>>,
) -> Result<TransferReport> {
    let start = Instant::now();
    let probe_opts = ProbeOptions {
        connect_timeout: cfg.connect_timeout(),
        ..ProbeOptions::default()
    };
    let info = probe::probe(&req.url, &req.headers, probe_opts)
        .with_context(|| format!("probe {}", req.url))?;
    tracing::info!(
        size = info.size,
        etag = info.fingerprint.as_deref().unwrap_or(""),
        "resource content length: {} bytes",
        info.size
    );
    if let Some(expected) = &req.expected_etag {
        probe::check_fingerprint(&info, expected)?;
    }

    let part = storage::temp_path(&req.output);
    let curl = CurlOptions::from(cfg);
    let mut report = match req.mode {
        Mode::Parallel { workers } => {
            run_parallel(req, cfg, &info, &part, workers, curl, cancel, progress)?
        }
        Mode::Sequential => run_sequential(req, &info, &part, curl, cancel)?,
    };

    if let Some(expected) = &req.expected_digest {
        if let Err(e) = checksum::verify(&req.output, expected) {
            remove_quietly(&req.output);
            return Err(e.into());
        }
        tracing::info!(algorithm = %expected.algorithm, "integrity check passed");
    }

    report.elapsed = start.elapsed();
    tracing::info!(
        "all {} bytes downloaded to {} in {:.3} seconds",
        report.bytes_written,
        req.output.display(),
        report.elapsed.as_secs_f64()
    );
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn run_parallel(
    req: &TransferRequest,
    cfg: &FetchConfig,
    info: &ResourceInfo,
    part: &Path,
    workers: u32,
    curl: CurlOptions,
    cancel: &CancelToken,
    progress: Option<&tokio::sync::mpsc::Sender<Progress>>,
) -> Result<TransferReport> {
    if !info.accept_ranges {
        tracing::warn!("server does not advertise Accept-Ranges: bytes; range requests may be rejected");
    }
    let plan = segmenter::plan(info.size, workers)?;
    let storage = storage::preallocate(part, info.size)
        .with_context(|| format!("preallocate {}", part.display()))?;

    let fetcher = Arc::new(CurlRangeFetcher::new(req.url.clone(), req.headers.clone(), curl));
    let result = downloader::download_ranges(
        &plan,
        fetcher,
        &storage,
        RunOptions {
            max_concurrent: cfg.max_concurrent,
            retry: cfg.retry_policy(),
            cancel: cancel.clone(),
            progress,
        },
    );
    match result {
        Ok(report) => {
            commit(storage, &req.output)?;
            Ok(report)
        }
        Err(e) => {
            abandon(storage);
            Err(e.into())
        }
    }
}

fn run_sequential(
    req: &TransferRequest,
    info: &ResourceInfo,
    part: &Path,
    curl: CurlOptions,
    cancel: &CancelToken,
) -> Result<TransferReport> {
    let start = Instant::now();
    let storage = storage::preallocate(part, info.size)
        .with_context(|| format!("preallocate {}", part.display()))?;
    let result =
        downloader::download_single(&req.url, &req.headers, &storage, Some(info.size), curl, cancel);
    match result {
        Ok(written) => {
            commit(storage, &req.output)?;
            Ok(TransferReport {
                total_size: info.size,
                ranges: 1,
                bytes_written: written,
                elapsed: start.elapsed(),
            })
        }
        Err(e) => {
            abandon(storage);
            Err(e)
        }
    }
}

/// Flush and atomically move the finished `.part` file into place.
fn commit(storage: StorageWriter, output: &Path) -> Result<()> {
    if let Err(e) = storage.sync() {
        abandon(storage);
        return Err(e.into());
    }
    let part = storage.path().to_path_buf();
    if let Err(e) = storage.finalize(output) {
        remove_quietly(&part);
        return Err(e.into());
    }
    Ok(())
}

/// Remove the `.part` file after a failed transfer.
fn abandon(storage: StorageWriter) {
    let path = storage.path().to_path_buf();
    if let Err(e) = storage.discard() {
        tracing::warn!("could not remove partial file {}: {}", path.display(), e);
    } else {
        tracing::debug!("removed partial file {}", path.display());
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!("could not remove {}: {}", path.display(), e);
    }
}
