//! Reactive Context
//!
//! The reactive context tracks which derivation is currently running.
//! This enables automatic dependency tracking: when an observable is read,
//! we can register the current derivation as a subscriber.
//!
//! # Implementation
//!
//! We use a thread-local stack. Running a derivation pushes an entry; every
//! observable read while that entry is on top is recorded in it. When the
//! guard drops, the entry is popped and its reads are reconciled with the
//! dependency graph, so the derivation ends up subscribed to exactly what it
//! read. The guard also runs while unwinding, which keeps the stack balanced
//! when user code panics.
//!
//! Entries without a derivation mark untracked regions: reads inside them
//! subscribe nothing, even when a derivation is running further down.

use std::cell::RefCell;

use indexmap::IndexSet;

use super::runtime::Runtime;
use crate::graph::{DerivationId, ObservableId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
#[derive(Debug)]
struct ContextEntry {
    /// The running derivation, or `None` for an untracked region.
    derivation: Option<DerivationId>,
    /// Observables read so far in this run, deduplicated, in read order.
    reads: IndexSet<ObservableId>,
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    derivation: Option<DerivationId>,
}

impl ReactiveContext {
    /// Enter a tracking context for the given derivation.
    ///
    /// The context is exited, and the derivation's subscriptions reconciled,
    /// when the returned guard is dropped.
    pub fn enter(derivation: DerivationId) -> Self {
        Self::push(Some(derivation))
    }

    /// Enter an untracked region.
    pub fn enter_untracked() -> Self {
        Self::push(None)
    }

    fn push(derivation: Option<DerivationId>) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                derivation,
                reads: IndexSet::new(),
            });
        });
        Self { derivation }
    }

    /// Check if reads on this thread are currently being tracked.
    pub fn is_tracking() -> bool {
        Self::current_derivation().is_some()
    }

    /// The derivation reads are attributed to, if any.
    pub fn current_derivation() -> Option<DerivationId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.derivation))
    }

    /// Number of entries on this thread's stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    /// Record a read of `observable` in the innermost entry.
    ///
    /// Returns the derivation to subscribe when the read is new for this run,
    /// `None` when untracked or already recorded.
    pub(crate) fn record_read(observable: ObservableId) -> Option<DerivationId> {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let entry = stack.last_mut()?;
            let derivation = entry.derivation?;
            entry.reads.insert(observable).then_some(derivation)
        })
    }

}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        let Some(entry) = popped else {
            return;
        };
        debug_assert_eq!(
            entry.derivation, self.derivation,
            "ReactiveContext mismatch: expected {:?}, got {:?}",
            self.derivation, entry.derivation
        );
        if let Some(derivation) = entry.derivation {
            Runtime::reconcile(derivation, entry.reads);
        }
    }
}

/// Run `body` with `derivation` as the tracking target.
pub fn track<R>(derivation: DerivationId, body: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter(derivation);
    body()
}

/// Run `f` without tracking any reads it makes.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter_untracked();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};

    // Reads recorded so far in the innermost entry.
    fn reads() -> Vec<ObservableId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.reads.iter().copied().collect())
                .unwrap_or_default()
        })
    }

    #[test]
    fn context_tracks_derivation() {
        let id = DerivationId::new();

        assert!(!ReactiveContext::is_tracking());
        assert!(ReactiveContext::current_derivation().is_none());

        {
            let _ctx = ReactiveContext::enter(id);
            assert!(ReactiveContext::is_tracking());
            assert_eq!(ReactiveContext::current_derivation(), Some(id));
        }

        assert!(!ReactiveContext::is_tracking());
        assert_eq!(ReactiveContext::depth(), 0);
    }

    #[test]
    fn reads_are_deduplicated() {
        let id = DerivationId::new();
        let a = ObservableId::new();
        let b = ObservableId::new();
        let _ctx = ReactiveContext::enter(id);

        assert_eq!(ReactiveContext::record_read(a), Some(id));
        assert_eq!(ReactiveContext::record_read(b), Some(id));
        assert_eq!(ReactiveContext::record_read(a), None);

        assert_eq!(reads(), vec![a, b]);
    }

    #[test]
    fn nested_contexts() {
        let outer = DerivationId::new();
        let inner = DerivationId::new();

        {
            let _outer = ReactiveContext::enter(outer);
            {
                let _inner = ReactiveContext::enter(inner);
                assert_eq!(ReactiveContext::current_derivation(), Some(inner));
            }
            assert_eq!(ReactiveContext::current_derivation(), Some(outer));
        }

        assert!(ReactiveContext::current_derivation().is_none());
    }

    #[test]
    fn untracked_region_hides_outer_derivation() {
        let id = DerivationId::new();
        let obs = ObservableId::new();

        track(id, || {
            untracked(|| {
                assert!(!ReactiveContext::is_tracking());
                assert_eq!(ReactiveContext::record_read(obs), None);
            });
            assert_eq!(ReactiveContext::current_derivation(), Some(id));
        });
    }

    #[test]
    fn stack_unwinds_on_panic() {
        let id = DerivationId::new();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            track(id, || {
                untracked(|| panic!("body failed"));
            })
        }));

        assert!(result.is_err());
        assert_eq!(ReactiveContext::depth(), 0);
    }
}
