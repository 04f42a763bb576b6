//! Dependency Graph
//!
//! The graph owns both directions of every subscription:
//!
//! - observable → derivations subscribed to it, in subscription order
//! - derivation → observables it read during its last run
//!
//! Both sides are updated together so the graph is always symmetric. The
//! graph is pure bookkeeping: it never runs user code. The runtime takes
//! snapshots from it and releases its lock before notifying anyone.

use std::collections::HashMap;

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::node::{DerivationId, DerivationKind, DerivationNode, ObservableId, ObservableNode};

/// Observer snapshot taken while notifying. Most observables have few observers.
pub type ObserverList = SmallVec<[DerivationId; 4]>;

/// Result of reconciling a derivation's read-set after a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    /// Subscriptions that were not present before the run.
    pub added: usize,
    /// Stale subscriptions from the previous run that were dropped.
    pub removed: usize,
}

/// Bidirectional observable ↔ derivation subscription registry.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    observables: HashMap<ObservableId, ObservableNode>,
    derivations: HashMap<DerivationId, DerivationNode>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a derivation node. Returns `false` if it was already present.
    pub fn add_derivation(&mut self, id: DerivationId, kind: DerivationKind) -> bool {
        if self.derivations.contains_key(&id) {
            return false;
        }
        self.derivations.insert(id, DerivationNode::new(kind));
        true
    }

    /// Remove a derivation and every subscription it holds.
    pub fn remove_derivation(&mut self, id: DerivationId) -> Option<DerivationNode> {
        let node = self.derivations.remove(&id)?;
        for observable in node.observing() {
            self.detach(*observable, id);
        }
        Some(node)
    }

    pub fn contains_derivation(&self, id: DerivationId) -> bool {
        self.derivations.contains_key(&id)
    }

    /// Remove an observable that no longer exists, together with every edge to it.
    pub fn remove_observable(&mut self, id: ObservableId) {
        if let Some(node) = self.observables.remove(&id) {
            for derivation in node.observers() {
                if let Some(dependent) = self.derivations.get_mut(derivation) {
                    dependent.remove_observing(id);
                }
            }
        }
    }

    /// Subscribe `derivation` to `observable`.
    ///
    /// Ignored for derivations that are not in the graph (never registered or
    /// already disposed). Returns `true` if a new edge was created.
    pub fn subscribe(&mut self, observable: ObservableId, derivation: DerivationId) -> bool {
        let Some(node) = self.derivations.get_mut(&derivation) else {
            return false;
        };
        node.add_observing(observable);
        self.observables
            .entry(observable)
            .or_default()
            .add_observer(derivation)
    }

    /// Remove the edge between `observable` and `derivation`.
    pub fn unsubscribe(&mut self, observable: ObservableId, derivation: DerivationId) -> bool {
        if let Some(node) = self.derivations.get_mut(&derivation) {
            node.remove_observing(observable);
        }
        self.detach(observable, derivation)
    }

    /// Make the derivation's subscriptions exactly `reads`.
    ///
    /// Observables from the previous run that are not in `reads` lose the
    /// derivation; observables in `reads` gain it if they did not have it.
    /// If the derivation was removed while it ran, every edge to it that the
    /// run created is dropped instead.
    pub fn reconcile(&mut self, derivation: DerivationId, reads: IndexSet<ObservableId>) -> Reconciled {
        let Some(node) = self.derivations.get_mut(&derivation) else {
            for observable in &reads {
                self.detach(*observable, derivation);
            }
            return Reconciled::default();
        };

        let previous = node.replace_observing(reads.clone());
        let mut report = Reconciled::default();

        for stale in previous.iter().filter(|id| !reads.contains(*id)) {
            if self.detach(*stale, derivation) {
                report.removed += 1;
            }
        }
        for observable in &reads {
            let added = self
                .observables
                .entry(*observable)
                .or_default()
                .add_observer(derivation);
            if added {
                report.added += 1;
            }
        }

        report
    }

    /// Snapshot of the observers of `observable`, in subscription order.
    pub fn observers_of(&self, observable: ObservableId) -> ObserverList {
        self.observables
            .get(&observable)
            .map(|node| node.observers().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the observables `derivation` currently depends on.
    pub fn observing(&self, derivation: DerivationId) -> Vec<ObservableId> {
        self.derivations
            .get(&derivation)
            .map(|node| node.observing().iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn observer_count(&self, observable: ObservableId) -> usize {
        self.observables
            .get(&observable)
            .map(|node| node.observers().len())
            .unwrap_or(0)
    }

    pub fn dependency_count(&self, derivation: DerivationId) -> usize {
        self.derivations
            .get(&derivation)
            .map(|node| node.observing().len())
            .unwrap_or(0)
    }

    /// Number of observables that currently have at least one observer.
    pub fn observable_count(&self) -> usize {
        self.observables.len()
    }

    pub fn derivation_count(&self) -> usize {
        self.derivations.len()
    }

    /// Drop the observable → derivation half of an edge, pruning empty nodes.
    fn detach(&mut self, observable: ObservableId, derivation: DerivationId) -> bool {
        let Some(node) = self.observables.get_mut(&observable) else {
            return false;
        };
        let removed = node.remove_observer(derivation);
        if !node.has_observers() {
            self.observables.remove(&observable);
        }
        removed
    }
}
