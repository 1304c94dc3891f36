//! Execution status tracking.
//!
//! A transient record mutated by the dispatcher around each tool call
//! and consumed read-only by a status-display collaborator (status bar,
//! log line). Reset to idle after every dispatch and on cancellation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// What the engine is doing right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExecutionState {
    Idle,
    Executing { tool_name: String, args: Vec<String> },
    Stopped,
}

/// The status record a display collaborator reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub state: ExecutionState,
    pub started_at: Option<DateTime<Utc>>,
}

impl ExecutionStatus {
    pub fn idle() -> Self {
        Self {
            state: ExecutionState::Idle,
            started_at: None,
        }
    }
}

/// Shared handle to the current execution status.
///
/// The guarded record is plain data and stays valid across a panic, so
/// a poisoned lock is recovered rather than propagated.
#[derive(Debug, Clone)]
pub struct ExecutionStatusHandle {
    inner: Arc<Mutex<ExecutionStatus>>,
}

impl ExecutionStatusHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ExecutionStatus::idle())),
        }
    }

    /// Mark a tool as executing.
    pub fn set_executing(&self, tool_name: &str, args: &[String]) {
        let mut status = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        status.state = ExecutionState::Executing {
            tool_name: tool_name.to_string(),
            args: args.to_vec(),
        };
        status.started_at = Some(Utc::now());
    }

    /// Mark the engine as stopped by the user.
    pub fn set_stopped(&self) {
        let mut status = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        status.state = ExecutionState::Stopped;
        status.started_at = None;
    }

    /// Reset to idle.
    pub fn set_idle(&self) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = ExecutionStatus::idle();
    }

    /// Snapshot the current status for display.
    pub fn snapshot(&self) -> ExecutionStatus {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// RAII guard that resets the status to idle when dropped, on every
    /// exit path including panics mid-dispatch.
    pub fn reset_guard(&self) -> StatusResetGuard {
        StatusResetGuard {
            handle: self.clone(),
        }
    }
}

impl Default for ExecutionStatusHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Resets the owning handle to idle on drop.
pub struct StatusResetGuard {
    handle: ExecutionStatusHandle,
}

impl Drop for StatusResetGuard {
    fn drop(&mut self) {
        self.handle.set_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_snapshot() {
        let handle = ExecutionStatusHandle::new();
        handle.set_executing("ls", &["/tmp".to_string()]);

        let snap = handle.snapshot();
        match snap.state {
            ExecutionState::Executing { tool_name, args } => {
                assert_eq!(tool_name, "ls");
                assert_eq!(args, vec!["/tmp".to_string()]);
            }
            other => panic!("unexpected state: {other:?}"),
        }
        assert!(snap.started_at.is_some());
    }

    #[test]
    fn guard_resets_on_drop() {
        let handle = ExecutionStatusHandle::new();
        {
            let _guard = handle.reset_guard();
            handle.set_executing("ls", &[]);
        }
        assert_eq!(handle.snapshot().state, ExecutionState::Idle);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let handle = ExecutionStatusHandle::new();
        let poisoner = handle.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("poison the status lock");
        })
        .join();

        handle.set_executing("ls", &[]);
        assert!(matches!(
            handle.snapshot().state,
            ExecutionState::Executing { .. }
        ));
    }

    #[test]
    fn stopped_clears_start_time() {
        let handle = ExecutionStatusHandle::new();
        handle.set_executing("ls", &[]);
        handle.set_stopped();
        let snap = handle.snapshot();
        assert_eq!(snap.state, ExecutionState::Stopped);
        assert!(snap.started_at.is_none());
    }
}
