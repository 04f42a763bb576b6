//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects observables and
//! derivations. It owns the dependency graph and the registry of live
//! derivations.
//!
//! # How It Works
//!
//! 1. When a derivation is created, it registers with the runtime.
//!
//! 2. When a derivation reads an observable, the runtime records the
//!    subscription in the graph.
//!
//! 3. When the run ends, the runtime reconciles the derivation's
//!    subscriptions with what it actually read.
//!
//! 4. When an observable's value changes, the runtime looks up its
//!    observers and calls `notify()` on each, synchronously, in
//!    subscription order.
//!
//! # Thread Safety
//!
//! The tracking context is thread-local; the graph and the registry are
//! global behind `parking_lot` mutexes. No lock is held while a derivation
//! runs, so derivations may freely read, write, create, and dispose.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use indexmap::IndexSet;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use super::context::ReactiveContext;
use super::derivation::Derivation;
use crate::config::RuntimeConfig;
use crate::error::Error;
use crate::graph::{DependencyGraph, DerivationId, ObservableId};

/// The global reactive runtime.
pub struct Runtime;

// Derivations stay alive until disposed, whether or not their handles are kept.
static REGISTRY: OnceLock<Mutex<HashMap<DerivationId, Arc<dyn Derivation>>>> = OnceLock::new();
static GRAPH: OnceLock<Mutex<DependencyGraph>> = OnceLock::new();
static CONFIG: OnceLock<RwLock<RuntimeConfig>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<DerivationId, Arc<dyn Derivation>>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

fn graph() -> &'static Mutex<DependencyGraph> {
    GRAPH.get_or_init(|| Mutex::new(DependencyGraph::new()))
}

fn config_cell() -> &'static RwLock<RuntimeConfig> {
    CONFIG.get_or_init(|| RwLock::new(RuntimeConfig::default()))
}

impl Runtime {
    /// Install process-wide settings.
    pub fn configure(config: RuntimeConfig) {
        debug!(?config, "runtime configured");
        *config_cell().write() = config;
    }

    /// Current process-wide settings.
    pub fn config() -> RuntimeConfig {
        *config_cell().read()
    }

    /// Register a derivation so it can subscribe and be notified.
    pub(crate) fn register(derivation: Arc<dyn Derivation>) {
        let id = derivation.id();
        graph().lock().add_derivation(id, derivation.kind());
        registry().lock().insert(id, derivation);
    }

    /// Remove a derivation from the registry and the graph.
    ///
    /// Returns `false` if it was not registered.
    pub(crate) fn unregister(id: DerivationId) -> bool {
        let removed = registry().lock().remove(&id);
        graph().lock().remove_derivation(id);

        // The derivation (and whatever its closures own) is dropped here,
        // after both locks are released.
        removed.is_some()
    }

    /// Record a read of `observable` by whatever derivation is running.
    pub(crate) fn report_read(observable: ObservableId) {
        if let Some(derivation) = ReactiveContext::record_read(observable) {
            if graph().lock().subscribe(observable, derivation) {
                trace!(%observable, %derivation, "subscribed");
            }
            return;
        }

        if ReactiveContext::depth() == 0 && Self::config().observable_requires_reaction {
            let err = Error::TrackingViolation { observable };
            warn!(error = %err, "observable read without a derivation");
        }
    }

    /// Make `derivation`'s subscriptions match the reads of its last run.
    pub(crate) fn reconcile(derivation: DerivationId, reads: IndexSet<ObservableId>) {
        let report = graph().lock().reconcile(derivation, reads);
        if report.removed > 0 {
            trace!(%derivation, removed = report.removed, "dropped stale subscriptions");
        }
    }

    /// Notify every observer of `observable` that its value changed.
    ///
    /// This is the core update propagation mechanism. Observers are
    /// snapshotted first; each one is looked up again right before its
    /// notification so a derivation disposed by an earlier observer is
    /// skipped.
    pub(crate) fn notify_changed(observable: ObservableId) {
        let observers = graph().lock().observers_of(observable);
        if observers.is_empty() {
            return;
        }

        trace!(%observable, observers = observers.len(), "notifying");
        for id in observers {
            let derivation = registry().lock().get(&id).cloned();
            if let Some(derivation) = derivation {
                derivation.notify();
            }
        }
    }

    /// Drop every edge to an observable that no longer exists.
    pub(crate) fn forget_observable(observable: ObservableId) {
        graph().lock().remove_observable(observable);
    }

    /// Number of derivations subscribed to `observable`.
    pub fn observer_count(observable: ObservableId) -> usize {
        graph().lock().observer_count(observable)
    }

    /// Derivations subscribed to `observable`, in notification order.
    pub fn observers(observable: ObservableId) -> Vec<DerivationId> {
        graph().lock().observers_of(observable).into_vec()
    }

    /// Number of observables `derivation` currently depends on.
    pub fn dependency_count(derivation: DerivationId) -> usize {
        graph().lock().dependency_count(derivation)
    }

    /// Observables `derivation` currently depends on.
    pub fn dependencies(derivation: DerivationId) -> Vec<ObservableId> {
        graph().lock().observing(derivation)
    }

    /// Whether `derivation` is registered (created and not yet disposed).
    pub fn is_registered(derivation: DerivationId) -> bool {
        registry().lock().contains_key(&derivation)
    }

    /// Get the derivation reads are currently attributed to, if any.
    pub fn current_derivation() -> Option<DerivationId> {
        ReactiveContext::current_derivation()
    }

    /// Check if reads on this thread are currently being tracked.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_tracking()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DerivationKind;
    use crate::reactive::context::track;
    use crate::reactive::observable::Observable;
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Collects formatted log output for the current thread's subscriber.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    struct MockDerivation {
        id: DerivationId,
        notified: AtomicUsize,
        disposed: AtomicBool,
        log: Arc<Mutex<Vec<DerivationId>>>,
    }

    impl MockDerivation {
        fn new(log: Arc<Mutex<Vec<DerivationId>>>) -> Arc<Self> {
            Arc::new(Self {
                id: DerivationId::new(),
                notified: AtomicUsize::new(0),
                disposed: AtomicBool::new(false),
                log,
            })
        }
    }

    impl Derivation for MockDerivation {
        fn id(&self) -> DerivationId {
            self.id
        }

        fn kind(&self) -> DerivationKind {
            DerivationKind::Autorun
        }

        fn name(&self) -> &str {
            "mock"
        }

        fn run(self: Arc<Self>) {
            self.notified.fetch_add(1, Ordering::SeqCst);
            self.log.lock().push(self.id);
        }

        fn dispose(&self) {
            self.disposed.store(true, Ordering::SeqCst);
            Runtime::unregister(self.id);
        }

        fn is_disposed(&self) -> bool {
            self.disposed.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn runtime_registers_and_unregisters() {
        let mock = MockDerivation::new(Arc::default());
        let id = mock.id;

        Runtime::register(mock);
        assert!(Runtime::is_registered(id));

        assert!(Runtime::unregister(id));
        assert!(!Runtime::is_registered(id));
        assert!(!Runtime::unregister(id));
    }

    #[test]
    fn runtime_notifies_in_subscription_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = MockDerivation::new(log.clone());
        let second = MockDerivation::new(log.clone());
        let observable = ObservableId::new();

        Runtime::register(second.clone());
        Runtime::register(first.clone());

        track(second.id, || Runtime::report_read(observable));
        track(first.id, || Runtime::report_read(observable));

        Runtime::notify_changed(observable);

        assert_eq!(*log.lock(), vec![second.id, first.id]);
        assert_eq!(first.notified.load(Ordering::SeqCst), 1);

        first.dispose();
        second.dispose();
    }

    #[test]
    fn runtime_reconciles_after_run() {
        let mock = MockDerivation::new(Arc::default());
        let kept = ObservableId::new();
        let dropped = ObservableId::new();
        Runtime::register(mock.clone());

        track(mock.id, || {
            Runtime::report_read(kept);
            Runtime::report_read(dropped);
        });
        assert_eq!(Runtime::dependency_count(mock.id), 2);

        track(mock.id, || Runtime::report_read(kept));
        assert_eq!(Runtime::dependencies(mock.id), vec![kept]);
        assert_eq!(Runtime::observer_count(dropped), 0);

        mock.dispose();
        assert_eq!(Runtime::observer_count(kept), 0);
    }

    #[test]
    fn forgotten_observable_leaves_no_edges() {
        let mock = MockDerivation::new(Arc::default());
        let observable = ObservableId::new();
        Runtime::register(mock.clone());

        track(mock.id, || Runtime::report_read(observable));
        Runtime::forget_observable(observable);

        assert_eq!(Runtime::dependency_count(mock.id), 0);
        Runtime::notify_changed(observable);
        assert_eq!(mock.notified.load(Ordering::SeqCst), 0);

        mock.dispose();
    }

    #[test]
    fn strict_mode_warns_but_still_reads() {
        let value = Observable::new(41);
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let logs = logs.clone();
                move || logs.clone()
            })
            .with_ansi(false)
            .finish();

        Runtime::configure(RuntimeConfig {
            observable_requires_reaction: true,
            ..Runtime::config()
        });
        let read = tracing::subscriber::with_default(subscriber, || value.get());
        Runtime::configure(RuntimeConfig::default());

        assert_eq!(read, 41);
        assert_eq!(value.observer_count(), 0);

        let output = logs.contents();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains(&value.id().to_string()), "{output}");
    }
}
