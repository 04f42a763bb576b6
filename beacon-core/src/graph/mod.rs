//! Dependency Graph
//!
//! This module implements the bookkeeping that links observables to the
//! derivations reading them.
//!
//! # Overview
//!
//! The graph is bipartite:
//!
//! - Observable nodes hold the derivations subscribed to them, in the order
//!   they subscribed. A write notifies them in that order.
//! - Derivation nodes hold the observables read during their last run.
//!
//! After every run the derivation's edges are reconciled against what it
//! actually read, so dependencies are dynamic: a branch not taken in the
//! latest run leaves no subscription behind.

mod dependency_graph;
mod node;

pub use dependency_graph::{DependencyGraph, ObserverList, Reconciled};
pub use node::{DerivationId, DerivationKind, DerivationNode, ObservableId, ObservableNode};
