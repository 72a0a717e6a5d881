//! A cloneable handle for observing and aborting the client's operation.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio_util::sync::CancellationToken;

use crate::outcome::CancelReason;

/// Lifecycle of one streaming operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Sending,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Cancelled | Phase::Failed)
    }
}

/// Cancellation state of a single operation
pub(crate) struct OperationControl {
    pub(crate) id: u64,
    pub(crate) token: CancellationToken,
    reason: Mutex<Option<CancelReason>>,
}

impl OperationControl {
    /// Cancel with `reason`; the first reason recorded wins
    pub(crate) fn cancel(&self, reason: CancelReason) {
        {
            let mut slot = self.reason.lock();
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        self.token.cancel();
    }

    pub(crate) fn reason(&self) -> CancelReason {
        self.reason.lock().unwrap_or(CancelReason::User)
    }
}

/// A cloneable handle onto a [`crate::StreamingClient`].
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone)]
pub struct ClientHandle {
    current: Arc<Mutex<Option<Arc<OperationControl>>>>,
    phase: Arc<Mutex<Phase>>,
    next_id: Arc<AtomicU64>,
}

impl ClientHandle {
    pub(crate) fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            phase: Arc::new(Mutex::new(Phase::Idle)),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a new operation, cancelling the one in flight
    pub(crate) fn begin(&self) -> Arc<OperationControl> {
        let control = Arc::new(OperationControl {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            token: CancellationToken::new(),
            reason: Mutex::new(None),
        });

        let mut current = self.current.lock();
        if let Some(previous) = current.replace(Arc::clone(&control)) {
            tracing::debug!(previous = previous.id, next = control.id, "Superseding operation");
            previous.cancel(CancelReason::Superseded);
        }
        *self.phase.lock() = Phase::Idle;
        control
    }

    /// Update the phase if `id` is still the current operation
    pub(crate) fn set_phase(&self, id: u64, phase: Phase) {
        let current = self.current.lock();
        if current.as_ref().is_some_and(|c| c.id == id) {
            *self.phase.lock() = phase;
        }
    }

    /// Record the terminal phase and release the operation slot
    pub(crate) fn finish(&self, id: u64, phase: Phase) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|c| c.id == id) {
            *current = None;
            *self.phase.lock() = phase;
        }
    }

    /// Abort the operation in flight, if any.
    pub fn abort(&self) {
        if let Some(control) = self.current.lock().as_ref() {
            control.cancel(CancelReason::User);
        }
    }

    /// Phase of the most recent operation
    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    /// Whether an operation is in flight.
    pub fn is_running(&self) -> bool {
        self.current.lock().is_some()
    }
}

/// Releases the operation slot if its stream is dropped before finishing
pub(crate) struct OperationGuard {
    pub(crate) handle: ClientHandle,
    pub(crate) control: Arc<OperationControl>,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.control.token.cancel();
        self.handle.finish(self.control.id, Phase::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_supersedes_previous() {
        let handle = ClientHandle::new();
        let first = handle.begin();
        let second = handle.begin();

        assert!(first.token.is_cancelled());
        assert_eq!(first.reason(), CancelReason::Superseded);
        assert!(!second.token.is_cancelled());
        assert!(handle.is_running());
    }

    #[test]
    fn test_stale_operation_cannot_touch_phase() {
        let handle = ClientHandle::new();
        let first = handle.begin();
        let second = handle.begin();

        handle.set_phase(first.id, Phase::Streaming);
        handle.finish(first.id, Phase::Cancelled);
        assert_eq!(handle.phase(), Phase::Idle);
        assert!(handle.is_running());

        handle.finish(second.id, Phase::Completed);
        assert_eq!(handle.phase(), Phase::Completed);
        assert!(!handle.is_running());
    }

    #[test]
    fn test_abort_records_user_reason() {
        let handle = ClientHandle::new();
        let control = handle.begin();
        handle.abort();
        handle.abort();
        assert!(control.token.is_cancelled());
        assert_eq!(control.reason(), CancelReason::User);
    }
}
