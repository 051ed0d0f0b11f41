//! Error type shared by every container in the crate.

use core::fmt;
use thiserror::Error;

/// Failure outcomes of container operations.
///
/// Every mutating operation either succeeds or returns one of these and
/// leaves the container exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A table was requested with zero buckets.
    #[error("bucket count must be greater than zero")]
    ZeroBuckets,

    /// A copy capability could not produce a duplicate.
    #[error("copy capability failed to duplicate an element")]
    CopyFailed,

    /// No key or element matched the query.
    #[error("no matching key or element")]
    NotFound,

    /// Positional access past the end of a list.
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange {
        /// The requested position
        index: usize,
        /// The list length at the time of the call
        len: usize,
    },

    /// `destroy` was handed an absent container.
    #[error("container handle is absent")]
    Absent,

    /// A render capability reported a formatting failure.
    #[error("render capability failed")]
    Render(#[from] fmt::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
