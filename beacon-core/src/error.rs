//! Error types for the reactive runtime.

use thiserror::Error;

use crate::graph::{DerivationId, ObservableId};

/// Errors surfaced by the runtime.
///
/// Panics raised by user code inside a derivation are not wrapped here: they
/// unwind through the runtime (which restores its tracking state on the way)
/// and reach whoever triggered the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An observable was read outside any derivation while
    /// `observable_requires_reaction` is enabled.
    #[error("observable {observable} was read outside of a reactive context")]
    TrackingViolation { observable: ObservableId },

    /// Positional array operation past the end of the array.
    #[error("index {index} is out of bounds for array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A derivation kept invalidating itself while running.
    #[error("derivation {derivation} did not converge after {iterations} iterations")]
    NonConvergent {
        derivation: DerivationId,
        iterations: usize,
    },
}

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;
