//! Equality strategies for reactions.
//!
//! A reaction fires its effect only when the new data value is not equal to
//! the previous one. The default uses `PartialEq`, which for
//! [`ObservableArray`] means identity: two handles are equal only if they
//! point at the same array.

use std::sync::Arc;

use super::array::ObservableArray;

/// Equality predicate shared between a reaction and its options.
pub type Equality<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// `PartialEq` equality.
pub fn default<T>() -> Equality<T>
where
    T: PartialEq + 'static,
{
    Arc::new(|a: &T, b: &T| a == b)
}

/// Arrays are equal only when they are the same array.
pub fn identity<T>() -> Equality<ObservableArray<T>>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    Arc::new(|a: &ObservableArray<T>, b: &ObservableArray<T>| a.same_as(b))
}

/// Arrays are equal when they hold equal elements in the same order.
///
/// Contents are compared without tracking, so the comparison never adds
/// subscriptions to the reaction that runs it.
pub fn shallow<T>() -> Equality<ObservableArray<T>>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    Arc::new(|a: &ObservableArray<T>, b: &ObservableArray<T>| {
        a.same_as(b) || a.snapshot_untracked() == b.snapshot_untracked()
    })
}
