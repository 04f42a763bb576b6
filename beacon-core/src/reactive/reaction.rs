//! Reaction Implementation
//!
//! A reaction pairs a tracked *data* function with an untracked *effect*.
//!
//! # How Reactions Work
//!
//! 1. On creation the data function runs inside a tracking context and its
//!    value is cached. The effect does not fire unless `fire_immediately`
//!    is set.
//!
//! 2. When a dependency of the data function changes, the data function
//!    re-runs and the new value is compared with the cached one.
//!
//! 3. If they are equal, nothing else happens. Otherwise the cache is
//!    updated and the effect fires with the new value, the previous value,
//!    and the reaction's disposer.
//!
//! # Why Only the Data Function Is Tracked
//!
//! The effect runs in an untracked region, so whatever it reads never
//! becomes a dependency. The reaction re-runs only when the value it
//! watches can have changed.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::comparer::Equality;
use super::context::untracked;
use super::derivation::{Derivation, DerivationCore, Disposer};
use super::runtime::Runtime;
use crate::config::ReactionOptions;
use crate::graph::{DerivationId, DerivationKind};

type DataFn<T> = dyn Fn() -> T + Send + Sync;
type EffectFn<T> = dyn Fn(&T, Option<&T>, &Disposer) + Send + Sync;

struct ReactionInner<T> {
    core: DerivationCore,
    data: Box<DataFn<T>>,
    effect: Box<EffectFn<T>>,
    equals: Equality<T>,
    fire_immediately: bool,

    /// The data function's latest value (None before the first run).
    value: Mutex<Option<T>>,
}

impl<T> ReactionInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// One evaluation: recompute, compare with the cache, maybe fire.
    fn evaluate(&self, handle: &Disposer) {
        let next = (self.data)();

        let previous = self.value.lock().replace(next.clone());
        let fire = match &previous {
            None => self.fire_immediately,
            Some(previous) => !(self.equals)(previous, &next),
        };

        if !fire {
            trace!(derivation = %self.core.id(), "reaction value unchanged");
            return;
        }
        untracked(|| (self.effect)(&next, previous.as_ref(), handle));
    }
}

impl<T> Derivation for ReactionInner<T>
where
    T: Clone + Send + Sync + 'static,
{
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
        self.core.execute(|| self.evaluate(&handle));
    }

    fn dispose(&self) {
        self.core.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }
}

/// A value-gated effect.
///
/// # Type Parameters
///
/// - `T`: The type the data function returns. Compared with `PartialEq`
///   unless the options supply another equality.
///
/// # Example
///
/// ```rust
/// use beacon_core::{Observable, Reaction};
///
/// let celsius = Observable::new(20);
///
/// let source = celsius.clone();
/// let alarm = Reaction::new(
///     move || source.get() > 30,
///     |hot, _, _| println!("hot: {hot}"),
/// );
///
/// celsius.set(25); // still not hot, effect silent
/// celsius.set(35); // prints "hot: true"
/// assert_eq!(alarm.value(), Some(true));
/// alarm.dispose();
/// ```
pub struct Reaction<T> {
    inner: Arc<ReactionInner<T>>,
}

impl<T> Reaction<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a reaction and run its data function once.
    pub fn new<D, E>(data: D, effect: E) -> Self
    where
        D: Fn() -> T + Send + Sync + 'static,
        E: Fn(&T, Option<&T>, &Disposer) + Send + Sync + 'static,
    {
        Self::with_options(data, effect, ReactionOptions::default())
    }

    /// Create a reaction with options and run its data function once.
    pub fn with_options<D, E>(data: D, effect: E, mut options: ReactionOptions<T>) -> Self
    where
        D: Fn() -> T + Send + Sync + 'static,
        E: Fn(&T, Option<&T>, &Disposer) + Send + Sync + 'static,
    {
        let equals = options.equality();
        let inner = Arc::new(ReactionInner {
            core: DerivationCore::new(DerivationKind::Reaction, options.name.take()),
            data: Box::new(data),
            effect: Box::new(effect),
            equals,
            fire_immediately: options.fire_immediately,
            value: Mutex::new(None),
        });

        Runtime::register(inner.clone());
        inner.clone().run();

        Self { inner }
    }
}

impl<T> Reaction<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Get the reaction's unique ID.
    pub fn id(&self) -> DerivationId {
        self.inner.core.id()
    }

    pub fn name(&self) -> &str {
        self.inner.core.name()
    }

    /// The data function's latest value.
    pub fn value(&self) -> Option<T> {
        self.inner.value.lock().clone()
    }

    /// Number of times the data function has been evaluated.
    pub fn run_count(&self) -> usize {
        self.inner.core.run_count()
    }

    /// Number of observables read by the last data evaluation.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.id())
    }

    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// A handle that only disposes.
    pub fn disposer(&self) -> Disposer {
        Disposer::new(self.inner.clone())
    }
}

impl<T> Clone for Reaction<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Reaction<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("value", &self.value())
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Watch `data`; call `effect` whenever its value changes.
pub fn reaction<T, D, E>(data: D, effect: E) -> Disposer
where
    T: Clone + PartialEq + Send + Sync + 'static,
    D: Fn() -> T + Send + Sync + 'static,
    E: Fn(&T, Option<&T>, &Disposer) + Send + Sync + 'static,
{
    Reaction::new(data, effect).disposer()
}

/// [`reaction`] with options.
pub fn reaction_with<T, D, E>(data: D, effect: E, options: ReactionOptions<T>) -> Disposer
where
    T: Clone + PartialEq + Send + Sync + 'static,
    D: Fn() -> T + Send + Sync + 'static,
    E: Fn(&T, Option<&T>, &Disposer) + Send + Sync + 'static,
{
    Reaction::with_options(data, effect, options).disposer()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::array::ObservableArray;
    use crate::reactive::comparer;
    use crate::reactive::observable::Observable;
    use std::sync::atomic::{AtomicI32, Ordering};

    type Log<T> = Arc<Mutex<Vec<(T, Option<T>)>>>;

    fn recording<T>(log: &Log<T>) -> impl Fn(&T, Option<&T>, &Disposer) + Send + Sync + 'static
    where
        T: Clone + Send + 'static,
    {
        let log = log.clone();
        move |next, previous, _| log.lock().push((next.clone(), previous.cloned()))
    }

    #[test]
    fn effect_is_silent_on_creation() {
        let value = Observable::new(1);
        let log: Log<i32> = Arc::default();

        let source = value.clone();
        let reaction = Reaction::new(move || source.get(), recording(&log));

        assert!(log.lock().is_empty());
        assert_eq!(reaction.value(), Some(1));
        assert_eq!(reaction.run_count(), 1);
        reaction.dispose();
    }

    #[test]
    fn effect_fires_only_when_value_changes() {
        let value = Observable::new(3);
        let log: Log<bool> = Arc::default();

        let source = value.clone();
        let reaction = Reaction::new(move || source.get() % 2 == 0, recording(&log));

        value.set(5);
        value.set(6);
        value.set(8);
        value.set(9);

        assert_eq!(*log.lock(), vec![(true, Some(false)), (false, Some(true))]);
        assert_eq!(reaction.run_count(), 5);
        reaction.dispose();
    }

    #[test]
    fn fire_immediately_passes_no_previous_value() {
        let value = Observable::new("x");
        let log: Log<&str> = Arc::default();

        let source = value.clone();
        let disposer = reaction_with(
            move || source.get(),
            recording(&log),
            ReactionOptions::default().fire_immediately(true),
        );

        value.set("y");
        assert_eq!(*log.lock(), vec![("x", None), ("y", Some("x"))]);
        disposer.dispose();
    }

    #[test]
    fn effect_reads_are_not_tracked() {
        let watched = Observable::new(0);
        let side = Observable::new(0);
        let effect_runs = Arc::new(AtomicI32::new(0));

        let reaction = {
            let watched = watched.clone();
            let side = side.clone();
            let effect_runs = effect_runs.clone();
            Reaction::new(
                move || watched.get(),
                move |_, _, _| {
                    side.get();
                    effect_runs.fetch_add(1, Ordering::SeqCst);
                },
            )
        };

        watched.set(1);
        assert_eq!(effect_runs.load(Ordering::SeqCst), 1);
        assert_eq!(reaction.dependency_count(), 1);

        side.set(1);
        assert_eq!(effect_runs.load(Ordering::SeqCst), 1);
        assert_eq!(side.observer_count(), 0);

        reaction.dispose();
    }

    #[test]
    fn custom_equality_controls_firing() {
        let items = Observable::new(ObservableArray::from(vec![1, 2]));
        let fired = Arc::new(AtomicI32::new(0));

        let reaction = {
            let items = items.clone();
            let fired = fired.clone();
            Reaction::with_options(
                move || items.get(),
                move |_, _, _| {
                    fired.fetch_add(1, Ordering::SeqCst);
                },
                ReactionOptions {
                    equals: Some(comparer::shallow()),
                    ..Default::default()
                },
            )
        };

        // New array, same contents: shallow equality says unchanged.
        items.set(ObservableArray::from(vec![1, 2]));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        items.set(ObservableArray::from(vec![1, 2, 3]));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        reaction.dispose();
    }

    #[test]
    fn effect_can_dispose_the_reaction() {
        let value = Observable::new(0);
        let log: Log<i32> = Arc::default();

        let reaction = {
            let source = value.clone();
            let log = log.clone();
            Reaction::new(
                move || source.get(),
                move |next, previous, me| {
                    log.lock().push((*next, previous.copied()));
                    me.dispose();
                },
            )
        };

        value.set(1);
        value.set(2);

        assert_eq!(*log.lock(), vec![(1, Some(0))]);
        assert!(reaction.is_disposed());
        assert_eq!(value.observer_count(), 0);
    }

    #[test]
    fn debug_shows_name_and_value() {
        let reaction = Reaction::with_options(
            || 7,
            |_, _, _| {},
            ReactionOptions::default().named("seven"),
        );

        let debug = format!("{reaction:?}");
        assert!(debug.contains("seven"));
        assert!(debug.contains("Some(7)"));
        assert_eq!(
            format!("{:?}", reaction.disposer()),
            format!("Reaction {{ name: \"seven\", id: {}, disposed: false }}", reaction.id().raw())
        );
        reaction.dispose();
    }
}
