//! Reactive Primitives
//!
//! This module implements the reactive engine: observable boxes and arrays,
//! the tracking context, and the two derivation kinds (autoruns and
//! reactions).
//!
//! # Concepts
//!
//! ## Observables
//!
//! An [`Observable`] is a container for mutable state. When it is read while
//! a derivation runs, the derivation subscribes to it. When its value
//! changes, every subscriber is notified before the write returns.
//!
//! An [`ObservableArray`] is a sequence built from one observable per index
//! plus one for the length, so readers re-run only for the parts they read.
//!
//! ## Autoruns
//!
//! An [`Autorun`] runs immediately and re-runs on every change to anything it
//! read.
//!
//! ## Reactions
//!
//! A [`Reaction`] tracks a data function and fires a separate effect only
//! when the data value changes.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to detect
//! dependencies automatically and a global dependency graph to route
//! notifications. Dependencies are dynamic: each run's reads replace the
//! previous run's subscriptions.

mod array;
mod autorun;
pub mod comparer;
mod context;
mod derivation;
mod observable;
mod reaction;
mod runtime;

pub use array::{observable_array, ObservableArray};
pub use autorun::{autorun, autorun_with, Autorun};
pub use context::{track, untracked, ReactiveContext};
pub use derivation::{Derivation, Disposer};
pub use observable::{observable, Observable};
pub use reaction::{reaction, reaction_with, Reaction};
pub use runtime::Runtime;
