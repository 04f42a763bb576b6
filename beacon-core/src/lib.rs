//! Beacon Core
//!
//! This crate provides the core runtime for Beacon, an observable state
//! library. It implements:
//!
//! - Observable boxes and arrays with per-index change tracking
//! - Automatic, dynamic dependency tracking
//! - Autoruns (re-run on every change) and reactions (value-gated effects)
//!
//! Everything is synchronous: a write has notified every affected
//! derivation, depth-first, by the time it returns.
//!
//! # Architecture
//!
//! - `reactive`: observables, the tracking context, derivations
//! - `graph`: the observable ↔ derivation subscription registry
//! - `config`: runtime and per-derivation settings
//!
//! # Example
//!
//! ```rust
//! use beacon_core::{autorun, reaction, Observable, ObservableArray};
//!
//! struct Store {
//!     items: Observable<ObservableArray<String>>,
//! }
//!
//! let store = Store {
//!     items: Observable::new(ObservableArray::from(vec!["a".to_string(), "b".to_string()])),
//! };
//!
//! let items = store.items.clone();
//! let printer = autorun(move |_| println!("{}", items.get().join(",")));
//!
//! let items = store.items.clone();
//! let counter = reaction(
//!     move || items.get().len(),
//!     |len, _, _| println!("length: {len}"),
//! );
//!
//! store.items.get_untracked().push("c".to_string()); // prints "a,b,c" then "length: 3"
//!
//! printer.dispose();
//! counter.dispose();
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::{AutorunOptions, ReactionOptions, RuntimeConfig};
pub use error::{Error, Result};
pub use graph::{DerivationId, DerivationKind, ObservableId};
pub use reactive::{
    autorun, autorun_with, observable, observable_array, reaction, reaction_with, untracked,
    Autorun, Disposer, Observable, ObservableArray, Reaction, Runtime,
};
