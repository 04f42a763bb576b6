//! Observable Array
//!
//! An ordered sequence with one observable box per index plus one box for the
//! length.
//!
//! # Granularity
//!
//! - `get(i)` subscribes to slot `i` only. Reading past the end subscribes to
//!   the length, so the reader re-runs when the array grows.
//! - `len()` subscribes to the length.
//! - Enumeration (`snapshot`, `to_vec`, `join`, `contains`) subscribes to the
//!   length and to every slot.
//!
//! # Writes
//!
//! - `set(i, v)` within bounds writes slot `i` and nothing else. At or past
//!   the end it appends hole slots up to `i`, a slot for `v`, and writes the
//!   length.
//! - Structural mutations (`push`, `pop`, `shift`, `unshift`, `insert`,
//!   `remove`, `splice`, `truncate`, `clear`, `replace`) rebuild the layout
//!   and store the new length under one lock. Only then are readers
//!   notified: the length once, every slot whose value actually changed,
//!   and readers of slots that disappeared. Every notified reader sees a
//!   length that matches the slots.
//!
//! An array handle is a reference: clones share contents, and equality is
//! identity. Putting a new array into an `Observable<ObservableArray<T>>` is
//! a single write of that outer box.

use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use super::observable::Observable;
use crate::error::{Error, Result};
use crate::graph::ObservableId;

/// A slot's value. `None` is a hole left by writing past the end.
type Slot<T> = Observable<Option<T>>;

/// What an index write resolved to while the slots were locked.
enum IndexWrite<T> {
    Existing(Slot<T>, T),
    Appended { length_changed: bool },
}

struct ArrayInner<T> {
    id: ObservableId,
    slots: RwLock<Vec<Slot<T>>>,
    length: Observable<usize>,
}

/// A reactive array with per-index granularity.
///
/// # Example
///
/// ```rust
/// use beacon_core::{reaction, ObservableArray};
///
/// let items = ObservableArray::from(vec!["a", "b"]);
///
/// let source = items.clone();
/// let disposer = reaction(
///     move || source.len(),
///     |len, previous, _| println!("length {previous:?} -> {len}"),
/// );
///
/// items.set(0, "a1"); // length unchanged, nothing printed
/// items.push("c");    // prints "length Some(2) -> 3"
/// disposer.dispose();
/// ```
pub struct ObservableArray<T> {
    inner: Arc<ArrayInner<T>>,
}

impl<T> ObservableArray<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new empty array.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Create an array from an existing vec.
    pub fn from_vec(values: Vec<T>) -> Self {
        let slots: Vec<Slot<T>> = values.into_iter().map(|v| Observable::new(Some(v))).collect();
        let len = slots.len();
        Self {
            inner: Arc::new(ArrayInner {
                id: ObservableId::new(),
                slots: RwLock::new(slots),
                length: Observable::new(len),
            }),
        }
    }

    /// Identity of the array itself, distinct from its slots and its length.
    pub fn id(&self) -> ObservableId {
        self.inner.id
    }

    /// Identity of the length box.
    pub fn length_id(&self) -> ObservableId {
        self.inner.length.id()
    }

    /// Identity of the box behind index `index`, if it exists.
    pub fn slot_id(&self, index: usize) -> Option<ObservableId> {
        self.inner.slots.read().get(index).map(Observable::id)
    }

    /// Whether two handles refer to the same array.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Current length (tracked).
    pub fn len(&self) -> usize {
        self.inner.length.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len_untracked(&self) -> usize {
        self.inner.length.get_untracked()
    }

    /// Value at `index` (tracked). `None` past the end or for a hole.
    pub fn get(&self, index: usize) -> Option<T> {
        let slot = self.inner.slots.read().get(index).cloned();
        match slot {
            Some(slot) => slot.get(),
            None => {
                self.inner.length.get();
                None
            }
        }
    }

    /// Every slot in order, holes included (tracked).
    pub fn snapshot(&self) -> Vec<Option<T>> {
        self.inner.length.get();
        let slots = self.inner.slots.read().clone();
        slots.iter().map(Observable::get).collect()
    }

    /// Every slot in order without subscribing anyone.
    pub fn snapshot_untracked(&self) -> Vec<Option<T>> {
        self.inner
            .slots
            .read()
            .iter()
            .map(Observable::get_untracked)
            .collect()
    }

    /// Every value in order, holes skipped (tracked).
    pub fn to_vec(&self) -> Vec<T> {
        self.snapshot().into_iter().flatten().collect()
    }

    /// Iterate over a tracked snapshot of the slots.
    pub fn iter(&self) -> std::vec::IntoIter<Option<T>> {
        self.snapshot().into_iter()
    }

    /// Whether any slot holds `value` (tracked).
    pub fn contains(&self, value: &T) -> bool {
        self.snapshot().iter().any(|slot| slot.as_ref() == Some(value))
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Write `value` at `index`.
    ///
    /// Within bounds only slot `index` is notified. Past the end, hole slots
    /// fill the gap and the length is written.
    pub fn set(&self, index: usize, value: T) {
        let write = {
            let mut slots = self.inner.slots.write();
            match slots.get(index).cloned() {
                Some(slot) => IndexWrite::Existing(slot, value),
                None => {
                    while slots.len() < index {
                        slots.push(Observable::new(None));
                    }
                    slots.push(Observable::new(Some(value)));
                    IndexWrite::Appended {
                        length_changed: self.inner.length.replace_silently(slots.len()),
                    }
                }
            }
        };

        match write {
            IndexWrite::Existing(slot, value) => slot.set(Some(value)),
            IndexWrite::Appended { length_changed } => {
                if length_changed {
                    self.inner.length.notify_observers();
                }
            }
        }
    }

    /// Append a value. Returns the new length.
    pub fn push(&self, value: T) -> usize {
        self.splice_with(|len| (len, 0), vec![Some(value)]);
        self.len_untracked()
    }

    /// Remove and return the last value.
    pub fn pop(&self) -> Option<T> {
        self.splice_with(|len| (len.saturating_sub(1), 1), Vec::new())
            .pop()
            .flatten()
    }

    /// Remove and return the first value.
    pub fn shift(&self) -> Option<T> {
        self.splice_with(|_| (0, 1), Vec::new()).pop().flatten()
    }

    /// Prepend a value. Returns the new length.
    pub fn unshift(&self, value: T) -> usize {
        self.splice_with(|_| (0, 0), vec![Some(value)]);
        self.len_untracked()
    }

    /// Insert `value` before `index`. `index == len` appends.
    pub fn insert(&self, index: usize, value: T) -> Result<()> {
        let len = self.len_untracked();
        if index > len {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        self.splice_with(|_| (index, 0), vec![Some(value)]);
        Ok(())
    }

    /// Remove the slot at `index`, returning its value (`None` for a hole).
    pub fn remove(&self, index: usize) -> Result<Option<T>> {
        let len = self.len_untracked();
        if index >= len {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        Ok(self.splice_with(|_| (index, 1), Vec::new()).pop().flatten())
    }

    /// Remove `delete_count` slots starting at `start` and insert `items`
    /// there. Out-of-range arguments are clamped. Returns the removed slots.
    pub fn splice<I>(&self, start: usize, delete_count: usize, items: I) -> Vec<Option<T>>
    where
        I: IntoIterator<Item = T>,
    {
        let items = items.into_iter().map(Some).collect();
        self.splice_with(|_| (start, delete_count), items)
    }

    /// Keep the first `len` slots.
    pub fn truncate(&self, len: usize) {
        self.splice_with(|current| (len, current), Vec::new());
    }

    /// Remove every slot.
    pub fn clear(&self) {
        self.truncate(0);
    }

    /// Swap the contents for `items`, keeping the array's identity.
    /// Returns the previous contents.
    pub fn replace<I>(&self, items: I) -> Vec<Option<T>>
    where
        I: IntoIterator<Item = T>,
    {
        let items = items.into_iter().map(Some).collect();
        self.splice_with(|len| (0, len), items)
    }

    /// The one structural mutation every other one is expressed with.
    ///
    /// `range` receives the current length and returns `(start, delete_count)`;
    /// both are clamped to the array.
    fn splice_with(
        &self,
        range: impl FnOnce(usize) -> (usize, usize),
        items: Vec<Option<T>>,
    ) -> Vec<Option<T>> {
        let (changed, vanished, removed, length_changed) = {
            let mut slots = self.inner.slots.write();
            let len = slots.len();
            let (start, delete_count) = range(len);
            let start = start.min(len);
            let end = start + delete_count.min(len - start);

            let old: Vec<Option<T>> = slots.iter().map(Observable::get_untracked).collect();
            let removed = old[start..end].to_vec();

            let mut next = Vec::with_capacity(len - (end - start) + items.len());
            next.extend_from_slice(&old[..start]);
            next.extend(items);
            next.extend_from_slice(&old[end..]);

            let mut changed = Vec::new();
            for (slot, value) in slots.iter().zip(next.iter()).skip(start) {
                if slot.replace_silently(value.clone()) {
                    changed.push(slot.clone());
                }
            }

            let vanished: Vec<Slot<T>> = if next.len() < len {
                slots.drain(next.len()..).collect()
            } else {
                slots.extend(next[len..].iter().cloned().map(Observable::new));
                Vec::new()
            };

            let length_changed = self.inner.length.replace_silently(next.len());
            (changed, vanished, removed, length_changed)
        };

        if length_changed {
            self.inner.length.notify_observers();
        }
        for slot in &changed {
            slot.notify_observers();
        }
        for slot in &vanished {
            slot.notify_observers();
        }

        removed
    }
}

impl<T> ObservableArray<T>
where
    T: Clone + PartialEq + Display + Send + Sync + 'static,
{
    /// Render every slot with `separator` between them (tracked). Holes
    /// render as empty strings.
    pub fn join(&self, separator: &str) -> String {
        self.snapshot()
            .iter()
            .map(|slot| slot.as_ref().map(ToString::to_string).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Create an observable array.
pub fn observable_array<T>(values: Vec<T>) -> ObservableArray<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    ObservableArray::from_vec(values)
}

impl<T> Clone for ObservableArray<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for ObservableArray<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for ObservableArray<T> {}

impl<T> Default for ObservableArray<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for ObservableArray<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn from(values: Vec<T>) -> Self {
        Self::from_vec(values)
    }
}

impl<T> FromIterator<T> for ObservableArray<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T> Debug for ObservableArray<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.inner.slots.read();
        let mut list = f.debug_list();
        for slot in slots.iter() {
            slot.with_value(|value| {
                list.entry(value);
            });
        }
        list.finish()
    }
}

impl<T> Serialize for ObservableArray<T>
where
    T: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let slots = self.inner.slots.read();
        let mut seq = serializer.serialize_seq(Some(slots.len()))?;
        for slot in slots.iter() {
            slot.with_value(|value| seq.serialize_element(value))?;
        }
        seq.end()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
