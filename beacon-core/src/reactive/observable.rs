//! Observable Box
//!
//! An `Observable<T>` is the fundamental reactive primitive. It holds a value
//! and tells the runtime when it is read and when it changes.
//!
//! # How Observables Work
//!
//! 1. When an observable is read while a derivation is running, the runtime
//!    subscribes that derivation to it (once per run, however many reads).
//!
//! 2. When an observable is written with a value different from the one it
//!    holds, every subscriber is notified before `set` returns.
//!
//! 3. Writing the value it already holds does nothing.
//!
//! # Identity
//!
//! Clones share the value and the identity. Dropping the last clone removes
//! the observable from the dependency graph.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Serialize, Serializer};

use super::runtime::Runtime;
use crate::graph::ObservableId;

struct ObservableInner<T> {
    id: ObservableId,
    value: RwLock<T>,
}

impl<T> Drop for ObservableInner<T> {
    fn drop(&mut self) {
        Runtime::forget_observable(self.id);
    }
}

/// A reactive box holding a value of type `T`.
///
/// # Example
///
/// ```rust
/// use beacon_core::{autorun, Observable};
///
/// let count = Observable::new(0);
///
/// let reader = count.clone();
/// let disposer = autorun(move |_| println!("count is {}", reader.get()));
///
/// count.set(5); // prints "count is 5"
/// disposer.dispose();
/// ```
pub struct Observable<T> {
    inner: Arc<ObservableInner<T>>,
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new observable with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(ObservableInner {
                id: ObservableId::new(),
                value: RwLock::new(value),
            }),
        }
    }

    /// Get the observable's unique ID.
    pub fn id(&self) -> ObservableId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If called while a derivation is running, the derivation subscribes.
    pub fn get(&self) -> T {
        Runtime::report_read(self.inner.id);
        self.inner.value.read().clone()
    }

    /// Read the current value by reference, with the same tracking as `get`.
    ///
    /// `f` must not write this observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Runtime::report_read(self.inner.id);
        f(&self.inner.value.read())
    }

    /// Get the current value without subscribing anyone.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Number of derivations currently subscribed.
    pub fn observer_count(&self) -> usize {
        Runtime::observer_count(self.inner.id)
    }

    /// Whether two handles refer to the same observable.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Set a new value and notify subscribers.
    ///
    /// Setting a value equal to the current one is a no-op.
    pub fn set(&self, value: T) {
        if self.replace_silently(value) {
            Runtime::notify_changed(self.inner.id);
        }
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let guard = self.inner.value.read();
            f(&guard)
        };
        self.set(next);
    }

    /// Store `value` without notifying. Returns whether it changed.
    ///
    /// Callers that batch several slot changes notify afterwards with
    /// [`notify_observers`](Self::notify_observers).
    pub(crate) fn replace_silently(&self, value: T) -> bool {
        let mut guard = self.inner.value.write();
        if *guard == value {
            return false;
        }
        *guard = value;
        true
    }
}

impl<T> Observable<T> {
    pub(crate) fn notify_observers(&self) {
        Runtime::notify_changed(self.inner.id);
    }

    /// Untracked read by reference, usable without the usual bounds.
    pub(crate) fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }
}

/// Create an observable box.
pub fn observable<T>(value: T) -> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    Observable::new(value)
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Observable<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> Debug for Observable<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .finish()
    }
}

impl<T> Serialize for Observable<T>
where
    T: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.value.read().serialize(serializer)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
