//! Autorun Implementation
//!
//! An autorun is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Autoruns Work
//!
//! 1. When created, the autorun runs its body immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the body re-runs synchronously, before
//!    the write that caused it returns. There is no batching: two writes
//!    mean two runs, each seeing the state after its own write.
//!
//! 3. Each run's reads replace the previous run's subscriptions.
//!
//! # Disposal
//!
//! The body receives the autorun's [`Disposer`], so it can stop itself.
//! Disposal is immediate: the autorun leaves the graph and never runs again.

use std::fmt;
use std::sync::Arc;

use super::derivation::{Derivation, DerivationCore, Disposer};
use super::runtime::Runtime;
use crate::config::AutorunOptions;
use crate::graph::{DerivationId, DerivationKind};

type Body = dyn Fn(&Disposer) + Send + Sync;

struct AutorunInner {
    core: DerivationCore,
    body: Box<Body>,
}

impl Derivation for AutorunInner {
    fn id(&self) -> DerivationId {
        self.core.id()
    }

    fn kind(&self) -> DerivationKind {
        self.core.kind()
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    fn run(self: Arc<Self>) {
        let handle = Disposer::new(self.clone());
        self.core.execute(|| (self.body)(&handle));
    }

    fn dispose(&self) {
        self.core.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }
}

/// A computation that re-runs every time something it read changes.
///
/// # Example
///
/// ```rust
/// use beacon_core::{Autorun, Observable};
///
/// let count = Observable::new(0);
///
/// let reader = count.clone();
/// let printer = Autorun::new(move |_| println!("Count is: {}", reader.get()));
///
/// count.set(5); // Prints: "Count is: 5"
/// assert_eq!(printer.run_count(), 2);
/// printer.dispose();
/// ```
#[derive(Clone)]
pub struct Autorun {
    inner: Arc<AutorunInner>,
}

impl Autorun {
    /// Create an autorun and run it once.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&Disposer) + Send + Sync + 'static,
    {
        Self::with_options(body, AutorunOptions::default())
    }

    /// Create an autorun with options and run it once.
    pub fn with_options<F>(body: F, options: AutorunOptions) -> Self
    where
        F: Fn(&Disposer) + Send + Sync + 'static,
    {
        let inner = Arc::new(AutorunInner {
            core: DerivationCore::new(DerivationKind::Autorun, options.name),
            body: Box::new(body),
        });

        Runtime::register(inner.clone());
        inner.clone().run();

        Self { inner }
    }

    /// Get the autorun's unique ID.
    pub fn id(&self) -> DerivationId {
        self.inner.core.id()
    }

    pub fn name(&self) -> &str {
        self.inner.core.name()
    }

    /// Run the body again now, as if a dependency had changed.
    pub fn run(&self) {
        self.inner.clone().run();
    }

    /// Get the number of times the body has run.
    pub fn run_count(&self) -> usize {
        self.inner.core.run_count()
    }

    /// Get the number of observables read by the last run.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.id())
    }

    /// Dispose of the autorun. After disposal it never runs again.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the autorun has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// A handle that only disposes.
    pub fn disposer(&self) -> Disposer {
        Disposer::new(self.inner.clone())
    }
}

impl fmt::Debug for Autorun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autorun")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Run `body` now and again whenever anything it read changes.
pub fn autorun<F>(body: F) -> Disposer
where
    F: Fn(&Disposer) + Send + Sync + 'static,
{
    Autorun::new(body).disposer()
}

/// [`autorun`] with options.
pub fn autorun_with<F>(body: F, options: AutorunOptions) -> Disposer
where
    F: Fn(&Disposer) + Send + Sync + 'static,
{
    Autorun::with_options(body, options).disposer()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::observable::Observable;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn autorun_runs_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let autorun = Autorun::new(move |_| {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(autorun.run_count(), 1);
        autorun.dispose();
    }

    #[test]
    fn autorun_runs_once_per_distinct_write() {
        let value = Observable::new(0);
        let reader = value.clone();
        let autorun = Autorun::new(move |_| {
            reader.get();
        });

        for n in 1..=5 {
            value.set(n);
        }
        value.set(5);

        assert_eq!(autorun.run_count(), 6);
        autorun.dispose();
    }

    #[test]
    fn autorun_does_not_run_after_disposal() {
        let value = Observable::new(0);
        let reader = value.clone();
        let autorun = Autorun::new(move |_| {
            reader.get();
        });

        value.set(1);
        autorun.dispose();
        assert!(autorun.is_disposed());
        assert_eq!(value.observer_count(), 0);

        value.set(2);
        autorun.run();
        assert_eq!(autorun.run_count(), 2);

        // Second dispose is harmless.
        autorun.dispose();
    }

    #[test]
    fn autorun_can_dispose_itself() {
        let value = Observable::new(0);
        let reader = value.clone();
        let autorun = Autorun::new(move |me| {
            if reader.get() >= 2 {
                me.dispose();
            }
        });

        value.set(1);
        value.set(2);
        value.set(3);

        assert!(autorun.is_disposed());
        assert_eq!(autorun.run_count(), 3);
        assert_eq!(value.observer_count(), 0);
    }

    #[test]
    fn autorun_uses_configured_name() {
        let autorun = Autorun::with_options(|_| {}, AutorunOptions::named("logger"));
        assert_eq!(autorun.name(), "logger");
        assert_eq!(autorun.disposer().name(), "logger");
        autorun.dispose();
    }

    #[test]
    fn autorun_clone_shares_state() {
        let first = Autorun::new(|_| {});
        let second = first.clone();

        assert_eq!(first.id(), second.id());
        first.run();
        assert_eq!(second.run_count(), 2);

        first.dispose();
        assert!(second.is_disposed());
    }
}
