//! Predicate double that counts its evaluations.

use crate::domain::context::CallContext;
use crate::domain::predicate::Predicate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Predicate with a fixed or computed answer that records how often it ran.
///
/// Useful for asserting that cached mappers are not re-resolved.
#[derive(Clone)]
pub struct CountingPredicate {
    calls: Arc<AtomicUsize>,
    answer: Arc<dyn Fn(&CallContext, &str) -> bool + Send + Sync>,
}

impl CountingPredicate {
    /// Always answer `result`.
    pub fn always(result: bool) -> Self {
        Self::new(move |_, _| result)
    }

    /// Answer with `check`.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&CallContext, &str) -> bool + Send + Sync + 'static,
    {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            answer: Arc::new(check),
        }
    }

    /// A predicate sharing this counter, for use in a field descriptor.
    pub fn predicate(&self) -> Predicate {
        let calls = Arc::clone(&self.calls);
        let answer = Arc::clone(&self.answer);
        Predicate::custom("counting", move |ctx, field| {
            calls.fetch_add(1, Ordering::SeqCst);
            answer(ctx, field)
        })
    }

    /// Number of evaluations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Reset the counter.
    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for CountingPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingPredicate")
            .field("calls", &self.calls())
            .finish()
    }
}
