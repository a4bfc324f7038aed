//! Errors raised while comparing movies or answering a recommendation query.
//!
//! Both variants are plain data (ids and lengths), so the enum is `Clone` and
//! `PartialEq` and tests can compare errors with `assert_eq!` directly.

use data_loader::{Facet, MovieId};
use thiserror::Error;

/// Errors from the distance function and the engine
///
/// Rust concept: the engine never panics on bad input. An unknown id or a
/// stale vector comes back as a value the caller can match on, which is how
/// the service decides to rebuild and retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimilarityError {
    /// The query id is not in the catalogue
    #[error("Unknown movie id {id}")]
    UnknownMovie { id: MovieId },

    /// Two vectors of the same facet have different lengths.
    ///
    /// One of them was encoded against an older vocabulary; rebuilding the
    /// vectors fixes it.
    #[error(
        "Incompatible {facet} vectors: movie {left} has length {left_len}, movie {right} has length {right_len}"
    )]
    IncompatibleFeatureVector {
        facet: Facet,
        left: MovieId,
        right: MovieId,
        left_len: usize,
        right_len: usize,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, SimilarityError>;
