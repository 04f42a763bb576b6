//! Graph Nodes
//!
//! This module defines the identifiers and node types that live in the
//! dependency graph.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

/// Unique identifier for an observable (a box, an array slot, or an array length).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservableId(u64);

impl ObservableId {
    /// Generate a new unique observable ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ObservableId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObservableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obs#{}", self.0)
    }
}

/// Unique identifier for a derivation (an autorun or a reaction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DerivationId(u64);

impl DerivationId {
    /// Generate a new unique derivation ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for DerivationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DerivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "der#{}", self.0)
    }
}

/// The kind of derivation a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationKind {
    /// Re-runs its whole body on every dependency change.
    Autorun,

    /// Re-evaluates a data function and fires an effect only when the value changed.
    Reaction,
}

impl fmt::Display for DerivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivationKind::Autorun => f.write_str("Autorun"),
            DerivationKind::Reaction => f.write_str("Reaction"),
        }
    }
}

/// An observable's entry in the graph.
///
/// Observers are kept in subscription order; notification walks them in
/// that order.
#[derive(Debug, Default)]
pub struct ObservableNode {
    observers: IndexSet<DerivationId>,
}

impl ObservableNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Returns `false` if it was already subscribed.
    pub fn add_observer(&mut self, id: DerivationId) -> bool {
        self.observers.insert(id)
    }

    /// Remove an observer, keeping the order of the remaining ones.
    pub fn remove_observer(&mut self, id: DerivationId) -> bool {
        self.observers.shift_remove(&id)
    }

    pub fn observers(&self) -> &IndexSet<DerivationId> {
        &self.observers
    }

    pub fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }
}

/// A derivation's entry in the graph.
#[derive(Debug)]
pub struct DerivationNode {
    kind: DerivationKind,

    /// Observables read during the last completed run.
    observing: IndexSet<ObservableId>,
}

impl DerivationNode {
    pub fn new(kind: DerivationKind) -> Self {
        Self {
            kind,
            observing: IndexSet::new(),
        }
    }

    pub fn kind(&self) -> DerivationKind {
        self.kind
    }

    pub fn observing(&self) -> &IndexSet<ObservableId> {
        &self.observing
    }

    pub fn add_observing(&mut self, id: ObservableId) -> bool {
        self.observing.insert(id)
    }

    pub fn remove_observing(&mut self, id: ObservableId) -> bool {
        self.observing.shift_remove(&id)
    }

    /// Swap in a new read-set, returning the previous one.
    pub fn replace_observing(&mut self, observing: IndexSet<ObservableId>) -> IndexSet<ObservableId> {
        std::mem::replace(&mut self.observing, observing)
    }
}
