// Error types shared by the entropy source, the generators and the
// drivers built on top of them.

use std::collections::TryReserveError;

/// Type alias for results produced anywhere in the engine
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a single generation or run.
///
/// A failing predicate is not an error: it is reported through
/// [`CheckResult`](crate::property::CheckResult).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The byte buffer backing the run has fewer bytes left than the draw needs.
    #[error("out of entropy: draw needed {needed} bytes but only {remaining} remain")]
    OutOfEntropy { needed: usize, remaining: usize },

    /// A collection could not reserve room for its elements.
    #[error("allocation failed: {0}")]
    Alloc(#[from] TryReserveError),
}

impl Error {
    /// Fuzz harnesses treat exhausted entropy as "skip this input", not a bug.
    pub fn is_out_of_entropy(&self) -> bool {
        matches!(self, Error::OutOfEntropy { .. })
    }
}
