//! Parallel range-fetch orchestration.
//!
//! Consumes a `TransferPlan`, runs one range GET per planned range (or a
//! bounded pool of workers when `max_concurrent` is set), writes each range to
//! storage at its offset and reduces all per-range results into one outcome.

mod fetch;
mod response;
mod run;
mod single;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::FetchConfig;
use crate::control::CancelToken;
use crate::retry::{FetchError, RetryPolicy};
use crate::segmenter::{ByteRange, PlanError, TransferPlan};
use crate::storage::{FileIoError, StorageWriter};

pub use fetch::{CurlRangeFetcher, RangeFetcher};
pub use single::download_single;

/// Timeouts and speed floor applied to every curl request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Hard deadline for one range GET.
    pub range_timeout: Duration,
    /// Abort if throughput stays below this many bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            range_timeout: Duration::from_secs(300),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
        }
    }
}

impl From<&FetchConfig> for CurlOptions {
    fn from(cfg: &FetchConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            range_timeout: cfg.range_timeout(),
            ..Self::default()
        }
    }
}

/// Progress snapshot sent to an optional consumer (e.g. the CLI).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub ranges_done: usize,
    pub ranges_total: usize,
    pub bytes_done: u64,
    pub total_bytes: u64,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        self.bytes_done as f64 / self.total_bytes as f64
    }
}

/// Knobs for one orchestrator run.
#[derive(Default)]
pub struct RunOptions<'a> {
    /// At most this many fetches in flight. None = one worker per range.
    pub max_concurrent: Option<usize>,
    /// Per-range retry with backoff. None = a failed range fails the transfer.
    pub retry: Option<RetryPolicy>,
    /// Caller-side cancel; the orchestrator also cancels its workers on first failure.
    pub cancel: CancelToken,
    pub progress: Option<&'a tokio::sync::mpsc::Sender<Progress>>,
}

/// A completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub total_size: u64,
    pub ranges: usize,
    pub bytes_written: u64,
    pub elapsed: Duration,
}

/// Why one range did not make it into the file.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Write(#[from] FileIoError),
}

#[derive(Debug)]
pub struct RangeFailure {
    /// Position of the range in the plan.
    pub index: usize,
    pub range: ByteRange,
    pub error: ChunkError,
}

impl fmt::Display for RangeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "range {} {}: {}", self.index, self.range, self.error)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("refusing to dispatch plan: {0}")]
    InvalidPlan(#[from] PlanError),
    #[error("{} of {total} range(s) failed: {}", .failures.len(), join_failures(.failures))]
    RangesFailed {
        total: usize,
        failures: Vec<RangeFailure>,
    },
    #[error("transfer cancelled")]
    Cancelled,
    #[error("range worker panicked")]
    WorkerPanicked,
    /// The OS refused another worker thread (e.g. thread limit reached).
    #[error("could not start range worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl TransferError {
    /// Failed ranges, if this is a range failure.
    pub fn failures(&self) -> &[RangeFailure] {
        match self {
            TransferError::RangesFailed { failures, .. } => failures,
            _ => &[],
        }
    }
}

fn join_failures(failures: &[RangeFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fetch every range of `plan` and write it into `storage` at its offset.
///
/// `storage` must already be preallocated to `plan.total_size`. Returns only
/// after every launched worker has finished. On failure the file content is
/// undefined; the caller is expected to discard it.
pub fn download_ranges(
    plan: &TransferPlan,
    fetcher: Arc<dyn RangeFetcher>,
    storage: &StorageWriter,
    opts: RunOptions<'_>,
) -> Result<TransferReport, TransferError> {
    plan.validate()?;
    let start = Instant::now();

    let work: Vec<(usize, ByteRange)> = plan.ranges.iter().copied().enumerate().collect();
    let count = work.len();
    let workers = opts.max_concurrent.unwrap_or(count).clamp(1, count.max(1));
    tracing::info!(
        total_size = plan.total_size,
        ranges = count,
        workers,
        "starting range download"
    );

    let bytes_written = if count == 0 {
        0
    } else {
        run::run_pool(run::Pool {
            fetcher,
            storage: storage.clone(),
            work,
            workers,
            retry: opts.retry,
            cancel: opts.cancel.child(),
            total_bytes: plan.total_size,
            progress: opts.progress,
            stack_size: None,
        })?
    };

    let report = TransferReport {
        total_size: plan.total_size,
        ranges: count,
        bytes_written,
        elapsed: start.elapsed(),
    };
    tracing::info!(
        bytes = report.bytes_written,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "range download complete"
    );
    Ok(report)
}
