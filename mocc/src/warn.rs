//! Process-scoped warning log.
//!
//! Per `spec.md` §7, solver non-convergence and geometry warnings (an FSR with zero rays through
//! it, an outer-loop iteration cap reached, ...) are never fatal. They accumulate here and are
//! drained at the end of a run, the way the original collects them into a process-global list
//! rather than threading a logger handle through every call.

use std::sync::{Mutex, OnceLock};

/// A single collected warning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    /// Human-readable message.
    pub message: String,
}

fn log() -> &'static Mutex<Vec<Warning>> {
    static LOG: OnceLock<Mutex<Vec<Warning>>> = OnceLock::new();
    LOG.get_or_init(|| Mutex::new(Vec::new()))
}

/// Records a warning in the process-scoped log.
pub fn push(message: impl Into<String>) {
    log()
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .push(Warning {
            message: message.into(),
        });
}

/// Returns a snapshot of all warnings recorded so far without clearing the log.
#[must_use]
pub fn snapshot() -> Vec<Warning> {
    log()
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .clone()
}

/// Drains and returns all warnings recorded so far, clearing the log.
pub fn drain() -> Vec<Warning> {
    std::mem::take(&mut log().lock().unwrap_or_else(std::sync::PoisonError::into_inner))
}
