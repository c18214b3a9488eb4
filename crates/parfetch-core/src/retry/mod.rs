//! Retry and backoff policy.
//!
//! Classifies range fetch errors (timeouts, throttling, connection failures,
//! short reads) and makes exponential backoff decisions so the orchestrator
//! can retry a single range without restarting the whole transfer.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::FetchError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
