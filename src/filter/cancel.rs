//! Cooperative cancellation token.
//!
//! A single shared flag, safe for concurrent reads from every worker a
//! filter spawns. Cancellation is best-effort: there is no preemption, and
//! a filter that never polls the token runs to completion.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag, cheap to clone across workers.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; visible to all clones.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once cancellation was requested.
    ///
    /// Workers poll this at loop boundaries (at minimum every fixed chunk
    /// of iterations) and exit their local loop promptly when set.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
