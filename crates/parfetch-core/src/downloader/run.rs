//! Worker pool: fan out range fetches over OS threads, fan results back in.

use std::collections::VecDeque;
use std::sync::{mpsc, Arc, Mutex, PoisonError};

use super::{ChunkError, Progress, RangeFailure, RangeFetcher, TransferError};
use crate::control::{Cancel, ChildToken};
use crate::retry::{run_with_retry, FetchError, RetryPolicy};
use crate::segmenter::ByteRange;
use crate::storage::StorageWriter;

/// Send a progress snapshot every this many completed ranges (plus a final one).
const COALESCE_PROGRESS_EVERY: usize = 2;

type Queue = Arc<Mutex<VecDeque<(usize, ByteRange)>>>;

pub(super) struct Pool<'a> {
    pub fetcher: Arc<dyn RangeFetcher>,
    pub storage: StorageWriter,
    pub work: Vec<(usize, ByteRange)>,
    pub workers: usize,
    pub retry: Option<RetryPolicy>,
    pub cancel: ChildToken,
    pub total_bytes: u64,
    pub progress: Option<&'a tokio::sync::mpsc::Sender<Progress>>,
    /// Worker stack size; None keeps the platform default.
    pub stack_size: Option<usize>,
}

/// Fetch one range (with retry when configured) and write it at its offset.
fn fetch_and_write(
    fetcher: &dyn RangeFetcher,
    storage: &StorageWriter,
    range: ByteRange,
    retry: Option<&RetryPolicy>,
    cancel: &ChildToken,
) -> Result<u64, ChunkError> {
    let fetch_once = |_attempt: u32| fetch_exact(fetcher, &range, cancel);
    let data = match retry {
        Some(p) => run_with_retry(p, cancel, fetch_once)?,
        None => fetch_once(1)?,
    };
    storage.write_at(range.offset, &data)?;
    Ok(range.length)
}

/// Fetch and enforce the length contract, whatever the fetcher implementation.
/// A wrong-sized payload is never handed to the writer.
fn fetch_exact(
    fetcher: &dyn RangeFetcher,
    range: &ByteRange,
    cancel: &dyn Cancel,
) -> Result<Vec<u8>, FetchError> {
    let data = fetcher.fetch(range, cancel)?;
    let received = data.len() as u64;
    if received < range.length {
        return Err(FetchError::ShortRead {
            expected: range.length,
            received,
        });
    }
    if received > range.length {
        return Err(FetchError::Overflow {
            expected: range.length,
        });
    }
    Ok(data)
}

fn drain(queue: &Queue) -> usize {
    let mut q = queue.lock().unwrap_or_else(PoisonError::into_inner);
    let n = q.len();
    q.clear();
    n
}

/// Run every queued range on `workers` threads. Results are processed as they
/// arrive; the first failure cancels in-flight siblings and drains the queue.
/// Every worker is joined before this returns. Returns bytes written.
pub(super) fn run_pool(pool: Pool<'_>) -> Result<u64, TransferError> {
    let Pool {
        fetcher,
        storage,
        work,
        workers,
        retry,
        cancel,
        total_bytes,
        progress,
        stack_size,
    } = pool;

    let count = work.len();
    let queue: Queue = Arc::new(Mutex::new(work.into_iter().collect()));
    let (tx, rx) = mpsc::channel::<(usize, ByteRange, Result<u64, ChunkError>)>();

    let mut handles = Vec::with_capacity(workers);
    let mut spawn_error = None;
    for worker in 0..workers {
        let worker_queue = Arc::clone(&queue);
        let tx = tx.clone();
        let fetcher = Arc::clone(&fetcher);
        let storage = storage.clone();
        let worker_cancel = cancel.clone();
        let mut builder = std::thread::Builder::new().name(format!("parfetch-range-{}", worker));
        if let Some(size) = stack_size {
            builder = builder.stack_size(size);
        }
        let spawned = builder.spawn(move || loop {
            if worker_cancel.is_cancelled() {
                break;
            }
            let next = worker_queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some((index, range)) = next else {
                break;
            };
            tracing::debug!(worker, index, offset = range.offset, len = range.length, "fetching range");
            let res =
                fetch_and_write(fetcher.as_ref(), &storage, range, retry.as_ref(), &worker_cancel);
            if tx.send((index, range, res)).is_err() {
                break;
            }
        });
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                // Workers already running stop at their next cancel check.
                tracing::warn!(worker, spawned = handles.len(), "could not spawn range worker: {}", e);
                cancel.cancel();
                drain(&queue);
                spawn_error = Some(e);
                break;
            }
        }
    }
    drop(tx);

    let mut failures: Vec<RangeFailure> = Vec::new();
    let mut ranges_done = 0usize;
    let mut bytes_done = 0u64;
    let mut completed_since_send = 0usize;
    let send_progress = |ranges_done: usize, bytes_done: u64| {
        if let Some(tx) = progress {
            let _ = tx.try_send(Progress {
                ranges_done,
                ranges_total: count,
                bytes_done,
                total_bytes,
            });
        }
    };

    // Ends once every worker has dropped its sender, i.e. exited.
    for (index, range, res) in rx {
        match res {
            Ok(n) => {
                ranges_done += 1;
                bytes_done += n;
                completed_since_send += 1;
                tracing::debug!(index, offset = range.offset, "range written");
                if completed_since_send >= COALESCE_PROGRESS_EVERY {
                    send_progress(ranges_done, bytes_done);
                    completed_since_send = 0;
                }
            }
            // Collateral of an earlier failure or a caller cancel, not a cause.
            Err(ChunkError::Fetch(FetchError::Cancelled)) if cancel.is_cancelled() => {
                tracing::debug!(index, "range cancelled");
            }
            Err(error) => {
                tracing::warn!(index, offset = range.offset, len = range.length, "range failed: {}", error);
                if failures.is_empty() {
                    cancel.cancel();
                    let dropped = drain(&queue);
                    if dropped > 0 {
                        tracing::debug!(dropped, "cancelled pending ranges after failure");
                    }
                }
                failures.push(RangeFailure { index, range, error });
            }
        }
    }
    if completed_since_send > 0 {
        send_progress(ranges_done, bytes_done);
    }

    let mut panicked = false;
    for h in handles {
        if h.join().is_err() {
            panicked = true;
        }
    }

    if let Some(e) = spawn_error {
        return Err(TransferError::Spawn(e));
    }
    if !failures.is_empty() {
        failures.sort_by_key(|f| f.index);
        return Err(TransferError::RangesFailed {
            total: count,
            failures,
        });
    }
    if panicked {
        return Err(TransferError::WorkerPanicked);
    }
    if ranges_done < count {
        if cancel.parent_cancelled() {
            tracing::info!(ranges_done, ranges_total = count, "transfer cancelled by caller");
        }
        return Err(TransferError::Cancelled);
    }
    Ok(bytes_done)
}
