//! Retry loop: run a fetch until success, a final error, or cancellation.

use std::time::Duration;

use super::classify;
use super::error::FetchError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::Cancel;

/// Backoff sleeps are split into slices this long so a cancel is seen promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Runs `f` until it succeeds or the retry policy says to stop. On retryable
/// failure, waits for the backoff delay then tries again. Returns
/// `FetchError::Cancelled` if `cancel` fires while waiting.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    cancel: &dyn Cancel,
    mut f: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        let err = match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        let kind = classify::classify(&err);
        match policy.decide(attempt, kind) {
            RetryDecision::NoRetry => return Err(err),
            RetryDecision::RetryAfter(_) if cancel.is_cancelled() => {
                return Err(FetchError::Cancelled);
            }
            RetryDecision::RetryAfter(d) => {
                tracing::debug!(attempt, ?kind, delay_ms = d.as_millis() as u64, "retrying after: {}", err);
                if !sleep_unless_cancelled(d, cancel) {
                    return Err(FetchError::Cancelled);
                }
                attempt += 1;
            }
        }
    }
}

/// Sleep for `d`; returns false (early) if cancelled.
fn sleep_unless_cancelled(d: Duration, cancel: &dyn Cancel) -> bool {
    let mut left = d;
    while !left.is_zero() {
        if cancel.is_cancelled() {
            return false;
        }
        let step = left.min(SLEEP_SLICE);
        std::thread::sleep(step);
        left -= step;
    }
    !cancel.is_cancelled()
}
