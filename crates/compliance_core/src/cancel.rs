//! Cooperative cancellation, threaded through every public pipeline
//! operation as a plain value rather than via task-cancellation machinery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Token for cooperative cancellation. Clone is cheap and shares state with
/// every clone, so one token can be handed to an entire call tree.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Correlation context threaded alongside a `CancellationToken` through a
/// stage invocation, per the Design Notes: correlation IDs travel via this
/// object, not global/thread-local state.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub correlation_id: compliance_ids::CorrelationId,
    pub cancellation: CancellationToken,
}

impl StageContext {
    /// Start a fresh stage invocation with a new correlation ID.
    pub fn new_stage() -> Self {
        Self {
            correlation_id: compliance_ids::CorrelationId::new(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Derive a sub-call context that shares this stage's correlation ID
    /// and cancellation token (per §4.2: the same CorrelationId propagates
    /// through all sub-calls of a stage).
    pub fn child(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_cancellation_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn child_context_preserves_correlation_id() {
        let ctx = StageContext::new_stage();
        let child = ctx.child();
        assert_eq!(ctx.correlation_id, child.correlation_id);
    }
}
