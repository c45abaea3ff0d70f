//! Batch supervision of spawned processes.
//!
//! The supervisor owns the handles the runner produced, observes each one's
//! completion, and reduces the batch to a single success/failure outcome. It
//! never fails itself: child failures become a flag, not an error.

use crate::runner::{ProcessEvent, ProcessHandle, MISSING_EXECUTABLE_CODE};

/// Aggregated result of awaiting one batch of processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// True when at least one process in the batch failed.
    pub error: bool,
}

/// Awaits every handle and aggregates the batch outcome.
///
/// Handles are observed strictly in the order given. The processes behind
/// them already run concurrently, so this serializes observation only; the
/// aggregate is a logical OR of failures and does not depend on order. Each
/// handle is resolved by its first terminal notification; a later duplicate
/// notification is ignored. An empty batch is a success.
pub async fn await_all(handles: Vec<ProcessHandle>) -> BatchOutcome {
    let mut error = false;
    for mut handle in handles {
        let code = resolve(&mut handle).await;
        if code != 0 {
            error = true;
        }
    }
    BatchOutcome { error }
}

async fn resolve(handle: &mut ProcessHandle) -> i32 {
    match handle.next_event().await {
        Some(ProcessEvent::Exited { code }) => code,
        Some(ProcessEvent::Closed { code }) => {
            if code == MISSING_EXECUTABLE_CODE {
                // Advisory only; the classification stays "failed".
                eprintln!(
                    "{} > {} closed with code {}; is {} installed?",
                    handle.package_name, handle.script, code, handle.executable
                );
            }
            code
        }
        // The spawn task vanished without reporting; count it as failed.
        None => -1,
    }
}
