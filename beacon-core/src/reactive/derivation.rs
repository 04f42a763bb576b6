//! Derivations
//!
//! A derivation is a unit of computation that re-runs when the observables it
//! read change. Autoruns and reactions are the two concrete kinds; both build
//! on [`DerivationCore`] for identity, the disposed flag, and the run loop.
//!
//! # Re-entrancy
//!
//! Writes made while a derivation runs notify other derivations immediately
//! (depth-first). A notification aimed at the derivation that is already
//! running is not recursed into: it marks the derivation pending and the
//! outer run repeats once the current pass ends, up to
//! [`RuntimeConfig::max_reaction_iterations`] passes.
//!
//! [`RuntimeConfig::max_reaction_iterations`]: crate::config::RuntimeConfig

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, error, trace};

use super::context;
use super::runtime::Runtime;
use crate::error::Error;
use crate::graph::{DerivationId, DerivationKind};

/// A computation the runtime can notify.
pub trait Derivation: Send + Sync {
    /// Unique identifier of this derivation.
    fn id(&self) -> DerivationId;

    fn kind(&self) -> DerivationKind;

    /// Name used in logs and `Debug` output.
    fn name(&self) -> &str;

    /// Execute the body inside a tracking context.
    fn run(self: Arc<Self>);

    /// Called by the runtime when a dependency changed.
    fn notify(self: Arc<Self>) {
        self.run();
    }

    /// Unsubscribe from everything and never run again. Idempotent.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// State shared by every derivation kind.
pub(crate) struct DerivationCore {
    id: DerivationId,
    kind: DerivationKind,
    name: String,
    disposed: AtomicBool,
    running: AtomicBool,
    pending: AtomicBool,
    run_count: AtomicUsize,
}

/// Clears the running flag, also on unwind.
struct RunningGuard<'a>(&'a DerivationCore);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.pending.store(false, Ordering::SeqCst);
        self.0.running.store(false, Ordering::SeqCst);
    }
}

impl DerivationCore {
    pub(crate) fn new(kind: DerivationKind, name: Option<String>) -> Self {
        let id = DerivationId::new();
        let name = name.unwrap_or_else(|| format!("{kind}@{}", id.raw()));
        debug!(derivation = %id, %name, "derivation created");
        Self {
            id,
            kind,
            name,
            disposed: AtomicBool::new(false),
            running: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        }
    }

    pub(crate) fn id(&self) -> DerivationId {
        self.id
    }

    pub(crate) fn kind(&self) -> DerivationKind {
        self.kind
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn run_count(&self) -> usize {
        self.run_count.load(Ordering::SeqCst)
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Run `body` inside a tracking context for this derivation.
    ///
    /// No-op once disposed. If the derivation is already running, the request
    /// is folded into the running call as one more pass.
    pub(crate) fn execute(&self, mut body: impl FnMut()) {
        if self.is_disposed() {
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            trace!(derivation = %self.id, "re-run requested while running");
            self.pending.store(true, Ordering::SeqCst);
            return;
        }
        let _running = RunningGuard(self);

        let max_iterations = Runtime::config().max_reaction_iterations.max(1);
        let mut iterations = 0;
        loop {
            self.pending.store(false, Ordering::SeqCst);
            iterations += 1;
            self.run_count.fetch_add(1, Ordering::SeqCst);

            context::track(self.id, &mut body);

            if !self.pending.load(Ordering::SeqCst) || self.is_disposed() {
                break;
            }
            if iterations >= max_iterations {
                let err = Error::NonConvergent {
                    derivation: self.id,
                    iterations,
                };
                error!(error = %err, name = %self.name, "giving up on derivation");
                break;
            }
        }
    }

    pub(crate) fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        Runtime::unregister(self.id);
        debug!(derivation = %self.id, name = %self.name, runs = self.run_count(), "derivation disposed");
    }
}

impl fmt::Debug for DerivationCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivationCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Handle that disposes a derivation.
///
/// Dropping a `Disposer` does not dispose anything: a derivation lives until
/// [`dispose`](Disposer::dispose) is called on any of its handles.
#[derive(Clone)]
#[must_use = "a derivation can only be stopped through its disposer"]
pub struct Disposer {
    derivation: Arc<dyn Derivation>,
}

impl Disposer {
    pub(crate) fn new(derivation: Arc<dyn Derivation>) -> Self {
        Self { derivation }
    }

    /// Stop the derivation. Calling this more than once is harmless.
    pub fn dispose(&self) {
        self.derivation.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.derivation.is_disposed()
    }

    pub fn id(&self) -> DerivationId {
        self.derivation.id()
    }

    pub fn kind(&self) -> DerivationKind {
        self.derivation.kind()
    }

    pub fn name(&self) -> &str {
        self.derivation.name()
    }
}

impl PartialEq for Disposer {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Disposer {}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(&self.kind().to_string())
            .field("name", &self.name())
            .field("id", &self.id().raw())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
