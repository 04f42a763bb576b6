//! Runtime and derivation configuration.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::reactive::comparer::{self, Equality};

/// Process-wide runtime settings, installed with [`Runtime::configure`].
///
/// [`Runtime::configure`]: crate::reactive::Runtime::configure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How many times a derivation may re-run because it invalidated itself
    /// before the runtime gives up on it.
    pub max_reaction_iterations: usize,

    /// Log a warning when an observable is read outside any derivation.
    pub observable_requires_reaction: bool,
}

impl RuntimeConfig {
    pub const DEFAULT_MAX_REACTION_ITERATIONS: usize = 100;
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_reaction_iterations: Self::DEFAULT_MAX_REACTION_ITERATIONS,
            observable_requires_reaction: false,
        }
    }
}

/// Options for [`autorun_with`](crate::autorun_with).
#[derive(Debug, Clone, Default)]
pub struct AutorunOptions {
    /// Name used in logs and `Debug` output. Defaults to `Autorun@<id>`.
    pub name: Option<String>,
}

impl AutorunOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()) }
    }
}

/// Options for [`reaction_with`](crate::reaction_with).
pub struct ReactionOptions<T> {
    /// Name used in logs and `Debug` output. Defaults to `Reaction@<id>`.
    pub name: Option<String>,

    /// Fire the effect once on creation, with no previous value.
    pub fire_immediately: bool,

    /// Decides whether two data values are equal. Defaults to `PartialEq`.
    pub equals: Option<Equality<T>>,
}

impl<T> ReactionOptions<T> {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn fire_immediately(mut self, fire: bool) -> Self {
        self.fire_immediately = fire;
        self
    }

    pub fn equals<F>(mut self, equals: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.equals = Some(Arc::new(equals));
        self
    }

    pub(crate) fn equality(&mut self) -> Equality<T>
    where
        T: PartialEq + 'static,
    {
        self.equals.take().unwrap_or_else(comparer::default)
    }
}

impl<T> Default for ReactionOptions<T> {
    fn default() -> Self {
        Self {
            name: None,
            fire_immediately: false,
            equals: None,
        }
    }
}

impl<T> Clone for ReactionOptions<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            fire_immediately: self.fire_immediately,
            equals: self.equals.clone(),
        }
    }
}

impl<T> fmt::Debug for ReactionOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactionOptions")
            .field("name", &self.name)
            .field("fire_immediately", &self.fire_immediately)
            .field("custom_equals", &self.equals.is_some())
            .finish()
    }
}
