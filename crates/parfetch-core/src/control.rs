//! Cancellation for in-flight transfers.
//!
//! A `CancelToken` is shared by the orchestrator, every worker and the caller.
//! Workers check it between retries and inside the curl progress callback, so a
//! cancel aborts an in-flight range GET instead of waiting for it to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Error returned when a transfer is stopped through its cancel token.
#[derive(Debug, thiserror::Error)]
#[error("transfer cancelled")]
pub struct Cancelled;

/// Shared cancel flag. Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// A token that is cancelled when either `self` or the returned token is.
    ///
    /// The orchestrator uses this to cancel its own workers on first failure
    /// without flipping the caller's token.
    pub fn child(&self) -> ChildToken {
        ChildToken {
            parent: self.clone(),
            own: CancelToken::new(),
        }
    }
}

/// Token linked to a parent: cancelled if the parent or itself is cancelled.
#[derive(Debug, Clone)]
pub struct ChildToken {
    parent: CancelToken,
    own: CancelToken,
}

impl ChildToken {
    pub fn cancel(&self) {
        self.own.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.own.is_cancelled() || self.parent.is_cancelled()
    }

    /// True only if the parent (caller) requested the cancel.
    pub fn parent_cancelled(&self) -> bool {
        self.parent.is_cancelled()
    }
}

/// Anything a fetch can poll for cancellation.
pub trait Cancel: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl Cancel for CancelToken {
    fn is_cancelled(&self) -> bool {
        CancelToken::is_cancelled(self)
    }
}

impl Cancel for ChildToken {
    fn is_cancelled(&self) -> bool {
        ChildToken::is_cancelled(self)
    }
}
