//! Shared cancellation flag.
//!
//! The one piece of state designed for cross-thread visibility: a UI or
//! signal handler sets it, and the engine polls it before each model
//! call, before each tool dispatch, and between streamed chunks.
//! Polling granularity bounds worst-case cancellation latency at one
//! model-response-or-chunk interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable stop flag polled at the engine's suspension points.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the in-flight engine call.
    pub fn trigger(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation has been requested.
    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }

    /// Clear the flag. The engine always resets it on the cancellation
    /// exit path so the next call starts clean.
    pub fn reset(&self) {
        self.inner.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_and_reset() {
        let flag = CancelFlag::new();
        assert!(!flag.is_set());
        flag.trigger();
        assert!(flag.is_set());
        flag.reset();
        assert!(!flag.is_set());
    }

    #[test]
    fn clones_share_state() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        other.trigger();
        assert!(flag.is_set());
    }
}
